// src/contract.rs
//! Argument/return enforcement around callable values.
//!
//! A `Contract` wraps a native function so each argument is checked
//! against its positional runtype before the function runs, and the
//! return value after. The `callback` combinator consumes this: validating
//! a callable hands back the enforced wrapper instead of the raw value.

use std::sync::Arc;

use crate::error::ValidationError;
use crate::runtype::Runtype;
use crate::value::{NativeFn, Value};

pub struct Contract {
    pub args: Vec<Runtype>,
    pub ret: Runtype,
}

impl Contract {
    pub fn new(args: Vec<Runtype>, ret: Runtype) -> Self {
        Contract { args, ret }
    }

    /// Wrap `f` with argument and return checks. The wrapper fails before
    /// `f` runs if any argument is invalid, and after if the return value
    /// is. Extra trailing arguments pass through unchecked.
    pub fn enforce(&self, f: NativeFn) -> NativeFn {
        let args = self.args.clone();
        let ret = self.ret.clone();
        Arc::new(move |xs: &[Value]| {
            if xs.len() < args.len() {
                return Err(ValidationError::new(format!(
                    "Expected {} arguments, but received {}",
                    args.len(),
                    xs.len()
                )));
            }
            for (runtype, x) in args.iter().zip(xs) {
                runtype.check(x)?;
            }
            let out = f(xs)?;
            ret.check(&out)
        })
    }
}

// ------------------------------- Tests ------------------------------------ //
