//! One connector module per LMS kind.

pub mod canvas;
