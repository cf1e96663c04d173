//! Step definitions for dispatch BDD scenarios.


mod given;
mod then;
