//! End-to-end tests for the task lifecycle runtime live under `tests/`.
