//! Integration tests for ordered SETTINGS application and window bookkeeping
