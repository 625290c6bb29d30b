//! Append-only source text buffer with a sticky error flag.
//!
//! Generators append freely and check once, in [`CodeBuilder::finalize`]. After the first
//! failed append every further append is a no-op.

use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct CodeBuilder {
    text: String,
    failed: bool,
}

/// `append!(builder, "fmt", args...)`: formatted append into a [`CodeBuilder`].
#[macro_export]
macro_rules! append {
    ($builder:expr, $($arg:tt)*) => {
        $builder.append_fmt(format_args!($($arg)*))
    };
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_raw(&mut self, text: &str) -> &mut Self {
        if self.failed {
            return self;
        }
        if self.text.try_reserve(text.len()).is_err() {
            self.failed = true;
        } else {
            self.text.push_str(text);
        }
        self
    }

    pub fn append_fmt(&mut self, args: fmt::Arguments<'_>) -> &mut Self {
        if !self.failed && fmt::Write::write_fmt(self, args).is_err() {
            self.failed = true;
        }
        self
    }

    /// Flag the build as failed without appending.
    pub fn mark_error(&mut self) {
        self.failed = true;
    }

    pub fn has_error(&self) -> bool {
        self.failed
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn finalize(self) -> Result<String> {
        if self.failed { Err(Error::OutOfMemory) } else { Ok(self.text) }
    }
}

impl fmt::Write for CodeBuilder {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append_raw(s);
        if self.failed { Err(fmt::Error) } else { Ok(()) }
    }
}
