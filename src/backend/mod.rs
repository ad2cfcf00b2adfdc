//! Display backend abstraction
//!
//! The switch logic only ever talks to [`DisplayBackend`]. Production uses
//! [`xrandr::XrandrBackend`]; tests use an in-memory fake.

pub mod xrandr;

use anyhow::Result;

use crate::layout::{Clause, Layout};

pub use xrandr::XrandrBackend;

pub trait DisplayBackend {
    /// Current layout of every active output, in backend enumeration order
    fn query_layout(&self) -> Result<Layout>;

    /// Names of every output with a monitor attached, in backend enumeration order
    fn connected_outputs(&self) -> Result<Vec<String>>;

    /// Apply the clauses in order as one configuration request
    fn apply(&self, clauses: &[Clause]) -> Result<()>;
}
