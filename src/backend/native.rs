//! Capability boundary to the accelerated vector index.
//!
//! The shared library is loaded once at startup. It must export:
//!
//! ```c
//! int knn_init_index(const int32_t* doc_ids, const float* vectors,
//!                    int32_t num_vectors, int32_t dimension,
//!                    int32_t intermediate_graph_degree, int32_t graph_degree);
//! int64_t knn_get_top_k(int handle, const float* query, int32_t dimension,
//!                       int32_t top_k, int32_t internal_top_k, int32_t search_width,
//!                       uint8_t** out);
//! void knn_free_buffer(uint8_t* buf, int64_t len);
//! ```
//!
//! `knn_init_index` returns a non-negative handle or a negative status;
//! `knn_get_top_k` returns the byte length of `*out` (see
//! [`crate::backend::decoder`]) or a negative status, and must be callable
//! from several threads at once.

use std::path::Path;
use std::ptr;
use std::sync::Arc;
use bytes::Bytes;
use libc::c_int;
use libloading::Library;
use parking_lot::Mutex;
use tracing::info;
use crate::backend::emulated::EmulatedAccelerator;
use crate::core::error::{Error, Result};

/// Value of `--native-lib` selecting the in-process emulator.
pub const EMULATED: &str = "emulated";

/// Environment variable consulted when no library path is configured.
pub const NATIVE_LIB_ENV: &str = "KNNDUEL_NATIVE_LIB";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHandle(pub i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildParams {
    pub intermediate_graph_degree: usize,
    pub graph_degree: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchParams {
    pub top_k: usize,
    pub internal_top_k: usize,
    pub search_width: usize,
}

/// What the accelerated backend needs from its native implementation.
pub trait AcceleratorBinding: Send + Sync {
    fn name(&self) -> &str;

    /// Build an index over `ids.len()` row-major vectors. Blocking.
    fn build_index(&self, ids: &[i32], vectors: &[f32], dimension: usize, params: &BuildParams)
        -> Result<IndexHandle>;

    /// Ranked results in the native buffer layout.
    fn query(&self, handle: IndexHandle, vector: &[f32], params: &SearchParams) -> Result<Bytes>;
}

type InitIndexFn = unsafe extern "C" fn(*const i32, *const f32, i32, i32, i32, i32) -> c_int;
type GetTopKFn = unsafe extern "C" fn(c_int, *const f32, i32, i32, i32, i32, *mut *mut u8) -> i64;
type FreeBufferFn = unsafe extern "C" fn(*mut u8, i64);

/// Binding backed by a dynamically loaded shared library.
pub struct NativeLibrary {
    name: String,
    init_index: InitIndexFn,
    get_top_k: GetTopKFn,
    free_buffer: FreeBufferFn,
    build_lock: Mutex<()>,
    // Keeps the function pointers above valid.
    _library: Library,
}

fn to_i32(value: usize, what: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::invalid_argument(format!("{} {} exceeds native range", what, value)))
}

impl NativeLibrary {
    pub fn load(path: &Path) -> Result<Self> {
        // SAFETY: loading runs the library's initializers; the library is
        // expected to implement the contract documented above.
        let library = unsafe { Library::new(path) }
            .map_err(|e| Error::native(format!("failed to load {}: {}", path.display(), e)))?;

        // SAFETY: symbol types match the documented C signatures.
        let (init_index, get_top_k, free_buffer) = unsafe {
            let init: libloading::Symbol<InitIndexFn> = library.get(b"knn_init_index\0")?;
            let top_k: libloading::Symbol<GetTopKFn> = library.get(b"knn_get_top_k\0")?;
            let free: libloading::Symbol<FreeBufferFn> = library.get(b"knn_free_buffer\0")?;
            (*init, *top_k, *free)
        };

        info!(path = %path.display(), "Loaded native accelerator library");
        Ok(NativeLibrary {
            name: path.display().to_string(),
            init_index,
            get_top_k,
            free_buffer,
            build_lock: Mutex::new(()),
            _library: library,
        })
    }
}

impl AcceleratorBinding for NativeLibrary {
    fn name(&self) -> &str {
        &self.name
    }

    fn build_index(&self, ids: &[i32], vectors: &[f32], dimension: usize, params: &BuildParams)
        -> Result<IndexHandle> {
        if vectors.len() != ids.len() * dimension {
            return Err(Error::invalid_argument(format!(
                "{} vectors of dimension {} need {} values, got {}",
                ids.len(),
                dimension,
                ids.len() * dimension,
                vectors.len()
            )));
        }
        let num_vectors = to_i32(ids.len(), "vector count")?;
        let dim = to_i32(dimension, "dimension")?;
        let intermediate = to_i32(params.intermediate_graph_degree, "intermediate graph degree")?;
        let degree = to_i32(params.graph_degree, "graph degree")?;

        let _session = self.build_lock.lock();
        // SAFETY: pointers are valid for the advertised lengths for the whole call.
        let status = unsafe {
            (self.init_index)(ids.as_ptr(), vectors.as_ptr(), num_vectors, dim, intermediate, degree)
        };
        if status < 0 {
            return Err(Error::native(format!("knn_init_index failed with status {}", status)));
        }
        Ok(IndexHandle(status))
    }

    fn query(&self, handle: IndexHandle, vector: &[f32], params: &SearchParams) -> Result<Bytes> {
        let dim = to_i32(vector.len(), "dimension")?;
        let top_k = to_i32(params.top_k, "top k")?;
        let itopk = to_i32(params.internal_top_k, "internal top k")?;
        let width = to_i32(params.search_width, "search width")?;

        let mut out: *mut u8 = ptr::null_mut();
        // SAFETY: `vector` is valid for `dim` floats; `out` receives a buffer
        // owned by the library until `knn_free_buffer`.
        let len = unsafe { (self.get_top_k)(handle.0, vector.as_ptr(), dim, top_k, itopk, width, &mut out) };
        if len < 0 {
            return Err(Error::native(format!("knn_get_top_k failed with status {}", len)));
        }
        // SAFETY: `out` and `len` come straight from `knn_get_top_k`.
        unsafe { claim_buffer(out, len, self.free_buffer) }
    }
}

/// Copy a library-owned result buffer and hand it back through `free`.
///
/// A null buffer is only valid with length 0. A non-null buffer is always
/// freed, even when empty.
///
/// # Safety
///
/// A non-null `out` must point to `len` readable bytes owned by the library
/// and not yet freed.
unsafe fn claim_buffer(out: *mut u8, len: i64, free: FreeBufferFn) -> Result<Bytes> {
    if out.is_null() {
        if len > 0 {
            return Err(Error::native(format!("knn_get_top_k reported {} bytes but returned no buffer", len)));
        }
        return Ok(Bytes::new());
    }

    let copied = if len > 0 {
        // SAFETY: guaranteed by the caller.
        unsafe { std::slice::from_raw_parts(out, len as usize) }.to_vec()
    } else {
        Vec::new()
    };
    // SAFETY: returning the buffer exactly once, with its length.
    unsafe { free(out, len) };
    Ok(Bytes::from(copied))
}

/// Resolve the accelerator named by `target` (a library path or
/// [`EMULATED`]), falling back to [`NATIVE_LIB_ENV`].
///
/// Errors here disable only the accelerated backend.
pub fn load_binding(target: Option<&str>) -> Result<Arc<dyn AcceleratorBinding>> {
    let from_env = std::env::var(NATIVE_LIB_ENV).ok();
    let target = target
        .map(str::to_string)
        .or(from_env)
        .ok_or_else(|| Error::native(format!("no native library configured (set --native-lib or {})", NATIVE_LIB_ENV)))?;

    if target.eq_ignore_ascii_case(EMULATED) {
        info!("Using emulated accelerator");
        return Ok(Arc::new(EmulatedAccelerator::new()));
    }
    Ok(Arc::new(NativeLibrary::load(Path::new(&target))?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use crate::core::error::ErrorKind;

    #[test]
    fn missing_library_is_a_native_binding_error() {
        let err = NativeLibrary::load(Path::new("/nonexistent/libknn.so")).err().unwrap();
        assert_eq!(err.kind, ErrorKind::NativeBinding);
    }

    #[test]
    fn emulated_target_needs_no_library() {
        let binding = load_binding(Some("emulated")).unwrap();
        assert_eq!(binding.name(), "emulated");
    }

    #[test]
    fn bad_path_fails_typed() {
        let err = load_binding(Some("/nonexistent/libknn.so")).err().unwrap();
        assert_eq!(err.kind, ErrorKind::NativeBinding);
    }

    static FREED: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn counting_free(_buf: *mut u8, _len: i64) {
        FREED.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn buffer_claims_follow_the_ownership_contract() {
        // length without a buffer is a protocol violation
        let err = unsafe { claim_buffer(ptr::null_mut(), 16, counting_free) }.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NativeBinding);
        assert!(unsafe { claim_buffer(ptr::null_mut(), 0, counting_free) }.unwrap().is_empty());
        assert_eq!(FREED.load(Ordering::SeqCst), 0);

        let mut empty = [0u8; 1];
        assert!(unsafe { claim_buffer(empty.as_mut_ptr(), 0, counting_free) }.unwrap().is_empty());
        assert_eq!(FREED.load(Ordering::SeqCst), 1);

        let mut data = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let copied = unsafe { claim_buffer(data.as_mut_ptr(), 8, counting_free) }.unwrap();
        assert_eq!(&copied[..], &data[..]);
        assert_eq!(FREED.load(Ordering::SeqCst), 2);
    }
}
