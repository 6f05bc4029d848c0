//! Operation dispatch: readiness check, cache lookup, compute on the worker
//! pool, cache insert, error recording on the calling thread.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tracing::trace;

use crate::cache::{self, OpKey};
use crate::error::{error, OpResult, Status};
use crate::image::VImage;
use crate::runtime;

/// Fingerprint of an operation's non-image arguments.
#[derive(Debug)]
pub(crate) struct Params {
    hasher: DefaultHasher,
}

impl Params {
    pub fn new() -> Self {
        Self { hasher: DefaultHasher::new() }
    }

    pub fn int(mut self, v: i64) -> Self {
        v.hash(&mut self.hasher);
        self
    }

    pub fn float(mut self, v: f64) -> Self {
        v.to_bits().hash(&mut self.hasher);
        self
    }

    pub fn floats(mut self, v: &[f64]) -> Self {
        v.len().hash(&mut self.hasher);
        for x in v {
            x.to_bits().hash(&mut self.hasher);
        }
        self
    }

    pub fn flag(mut self, v: bool) -> Self {
        v.hash(&mut self.hasher);
        self
    }

    pub fn text(mut self, v: &str) -> Self {
        v.hash(&mut self.hasher);
        self
    }

    fn finish(&self) -> u64 {
        self.hasher.finish()
    }
}

/// Runs a cacheable operation.
///
/// `compute` runs inside the worker pool; a failure is recorded in the
/// calling thread's error buffer.
pub(crate) fn call<F>(op: &'static str, inputs: &[&VImage], params: Params, compute: F) -> Status<VImage>
where
    F: FnOnce() -> OpResult<VImage> + Send,
{
    let Some(pool) = runtime::pool() else {
        return Err(error(op, "engine not initialized"));
    };
    let key = OpKey {
        op,
        inputs: inputs.iter().map(|i| i.id()).collect(),
        params: params.finish(),
    };
    if let Some(hit) = cache::with(|c| c.get(&key)) {
        return Ok(hit);
    }

    trace!(op, inputs = ?key.inputs, "compute");
    match pool.install(compute) {
        Ok(out) => {
            cache::with(|c| c.insert(key, out.clone()));
            Ok(out)
        }
        Err(e) => Err(e.record()),
    }
}

/// Runs an uncached operation, still gated on the engine running.
pub(crate) fn call_uncached<T, F>(op: &'static str, compute: F) -> Status<T>
where
    T: Send,
    F: FnOnce() -> OpResult<T> + Send,
{
    let Some(pool) = runtime::pool() else {
        return Err(error(op, "engine not initialized"));
    };
    trace!(op, "compute");
    pool.install(compute).map_err(|e| e.record())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_fingerprint_differs() {
        let a = Params::new().int(1).float(0.5).finish();
        let b = Params::new().int(1).float(0.25).finish();
        let c = Params::new().int(1).float(0.5).finish();
        assert_ne!(a, b);
        assert_eq!(a, c);
    }
}
