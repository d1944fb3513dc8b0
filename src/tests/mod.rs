//! End-to-end tests: real registry and worker servers on ephemeral ports.
