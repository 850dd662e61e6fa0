//! Cross-module scenarios: full pipelines driven the way the binary drives them.

mod scenario_tests;
