//! Circular dependency detection infrastructure.
//!
//! The stack is an explicit value owned by the outermost resolve call and
//! threaded by reference through every nested resolution, so concurrent
//! resolutions never share it.
//!
//! A resolver handed out as a built-in starts a new stack when called from
//! inside a factory. [`NestedEntries`] bounds how deeply such entry points
//! may nest on one thread.

use std::collections::HashMap;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use crate::error::{DiError, DiResult};
use crate::service_type::ServiceType;

const MAX_DEPTH: usize = 1024;
const MAX_NESTED_ENTRIES: usize = 32;

struct Frame {
    contract: ServiceType,
    implementation: Option<ServiceType>,
}

/// Types currently under construction for one logical resolve call.
#[derive(Default)]
pub(crate) struct ResolutionStack {
    frames: Mutex<Vec<Frame>>,
}

impl ResolutionStack {
    /// Pushes a frame, failing if the contract or implementation is already
    /// being constructed further up the chain.
    ///
    /// The frame is popped when the returned guard drops, on success and on
    /// error alike.
    pub(crate) fn enter(
        &self,
        contract: &ServiceType,
        implementation: Option<&ServiceType>,
    ) -> DiResult<StackGuard<'_>> {
        let mut frames = self.frames.lock();

        let revisits = frames.iter().any(|frame| {
            frame.contract == *contract
                || implementation.is_some_and(|ty| frame.implementation.as_ref() == Some(ty))
        });
        if revisits {
            let mut path: Vec<ServiceType> = frames.iter().map(|f| f.contract.clone()).collect();
            path.push(contract.clone());
            return Err(DiError::Circular(path));
        }

        if frames.len() >= MAX_DEPTH {
            return Err(DiError::DepthExceeded(frames.len()));
        }

        frames.push(Frame {
            contract: contract.clone(),
            implementation: implementation.cloned(),
        });
        Ok(StackGuard { stack: self })
    }

    /// Cycle error for `contract` re-entered from a separate entry point.
    pub(crate) fn cycle_through(&self, contract: &ServiceType) -> DiError {
        let frames = self.frames.lock();
        let mut path: Vec<ServiceType> = frames.iter().map(|f| f.contract.clone()).collect();
        path.push(contract.clone());
        DiError::Circular(path)
    }

    #[cfg(test)]
    fn depth(&self) -> usize {
        self.frames.lock().len()
    }
}

/// Pops the frame pushed by [`ResolutionStack::enter`].
pub(crate) struct StackGuard<'a> {
    stack: &'a ResolutionStack,
}

impl Drop for StackGuard<'_> {
    fn drop(&mut self) {
        self.stack.frames.lock().pop();
    }
}

/// Per-thread count of resolve calls entered through a public resolver
/// while another resolve call is still running on the same thread.
#[derive(Default)]
pub(crate) struct NestedEntries {
    active: Mutex<HashMap<ThreadId, usize>>,
}

impl NestedEntries {
    pub(crate) fn enter(&self) -> DiResult<EntryGuard<'_>> {
        let thread = thread::current().id();
        let mut active = self.active.lock();
        let depth = active.entry(thread).or_insert(0);
        if *depth >= MAX_NESTED_ENTRIES {
            return Err(DiError::DepthExceeded(*depth));
        }
        *depth += 1;
        Ok(EntryGuard {
            entries: self,
            thread,
        })
    }
}

pub(crate) struct EntryGuard<'a> {
    entries: &'a NestedEntries,
    thread: ThreadId,
}

impl Drop for EntryGuard<'_> {
    fn drop(&mut self) {
        let mut active = self.entries.active.lock();
        if let Some(depth) = active.get_mut(&self.thread) {
            *depth -= 1;
            if *depth == 0 {
                active.remove(&self.thread);
            }
        }
    }
}
