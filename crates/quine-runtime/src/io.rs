//! Host-side I/O surface shared with the kernel.

use parking_lot::RwLock;
use std::sync::Arc;
use wasmtime::{Caller, Extern, Linker};

/// State shared between the host and a running kernel.
///
/// The kernel writes through two imports: `env.log` copies a window of
/// guest memory into the output buffer, and `env.grow_memory` requests
/// extra pages. Clones share the same buffers, so a handle kept outside
/// the store observes everything the instance produced.
#[derive(Clone, Default)]
pub struct KernelIo {
    output: Arc<RwLock<Vec<u8>>>,
    grow_log: Arc<RwLock<Vec<u64>>>,
}

impl KernelIo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_output(&self, bytes: &[u8]) {
        self.output.write().extend_from_slice(bytes);
    }

    /// Drain everything logged since the last call.
    pub fn take_output(&self) -> Vec<u8> {
        let mut output = self.output.write();
        std::mem::take(&mut *output)
    }

    pub fn record_grow(&self, pages: u64) {
        self.grow_log.write().push(pages);
    }

    /// Drain the page counts of successful grow requests.
    pub fn take_grow_log(&self) -> Vec<u64> {
        let mut grow_log = self.grow_log.write();
        std::mem::take(&mut *grow_log)
    }

    /// Add host function imports to a linker
    pub fn add_to_linker(&self, linker: &mut Linker<Self>) -> Result<(), anyhow::Error> {
        // log: (ptr: i32, len: i32) -> void
        linker.func_wrap(
            "env",
            "log",
            |mut caller: Caller<'_, Self>, ptr: i32, len: i32| {
                let io = caller.data().clone();
                if let Some(Extern::Memory(memory)) = caller.get_export("memory") {
                    let data = memory.data(&caller);
                    let start = (ptr.max(0) as usize).min(data.len());
                    let end = start
                        .saturating_add(len.max(0) as usize)
                        .min(data.len());
                    io.append_output(&data[start..end]);
                }
            },
        )?;

        // grow_memory: (pages: i32) -> void
        linker.func_wrap(
            "env",
            "grow_memory",
            |mut caller: Caller<'_, Self>, pages: i32| {
                let io = caller.data().clone();
                if let Some(Extern::Memory(memory)) = caller.get_export("memory") {
                    match memory.grow(&mut caller, pages.max(0) as u64) {
                        Ok(old_pages) => {
                            tracing::debug!(pages, old_pages, "kernel grew its memory");
                            io.record_grow(pages.max(0) as u64);
                        }
                        Err(e) => tracing::warn!("grow_memory request failed: {}", e),
                    }
                }
            },
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_output_drains() {
        let io = KernelIo::new();
        io.append_output(b"hello");
        io.append_output(b" world");
        assert_eq!(io.take_output(), b"hello world");
        assert!(io.take_output().is_empty());
    }

    #[test]
    fn test_clones_share_buffers() {
        let io = KernelIo::new();
        let handle = io.clone();
        io.append_output(b"abc");
        io.record_grow(2);
        assert_eq!(handle.take_output(), b"abc");
        assert_eq!(handle.take_grow_log(), vec![2]);
    }
}
