//! Dynamic library loading and typed symbol resolution
//!
//! Platform wrapper around dlopen/LoadLibrary. Resolved entry points are
//! returned as `Signature` fn pointer types, ready for `Cif::bind`.

use crate::signature::Signature;
use core::ffi::c_void;
use core::mem;
use core::ptr::NonNull;
use std::ffi::CString;
use thiserror::Error;
use tracing::debug;

/// Library loading and symbol lookup errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LibraryError {
    #[error("invalid library or symbol name")]
    InvalidName,

    #[error("failed to load library: {0}")]
    LoadFailed(String),

    #[error("symbol not found: {0}")]
    NotFound(String),
}

/// Handle to a dynamically loaded library, or to the running process image
pub struct Library {
    handle: NonNull<c_void>,
    name: String,
    // Process-image handles on windows are borrowed, not reference counted.
    owned: bool,
}

impl Library {
    /// Load library by name
    ///
    /// Searches standard library paths. Use `load_path` for file paths.
    pub fn load(name: &str) -> Result<Self, LibraryError> {
        Self::load_impl(name)
    }

    /// Load library from a file path
    pub fn load_path(path: impl AsRef<std::path::Path>) -> Result<Self, LibraryError> {
        let path = path.as_ref().to_str().ok_or(LibraryError::InvalidName)?;
        Self::load_impl(path)
    }

    /// Handle to the running executable and everything it has loaded
    pub fn open_self() -> Result<Self, LibraryError> {
        let handle = Self::open_self_impl()?;
        debug!(target: "cifbind::library", "opened process image");
        Ok(handle)
    }

    /// Library name as given when loading
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Typed entry point for `name`
    ///
    /// Foreign code should be requested as an `unsafe extern "C" fn` type,
    /// so that calling the returned pointer directly still needs `unsafe`.
    ///
    /// # Safety
    /// The symbol must be a function whose real signature is `F`. Nothing
    /// checks this; calling through a mistyped entry point is undefined
    /// behavior. The returned pointer is only valid while `self` is alive.
    pub unsafe fn symbol<F: Signature>(&self, name: &str) -> Result<F, LibraryError> {
        let address = self.raw_symbol(name)?;
        debug_assert_eq!(mem::size_of::<F>(), mem::size_of::<*mut c_void>());
        Ok(mem::transmute_copy::<*mut c_void, F>(&address.as_ptr()))
    }

    /// Untyped address of `name`
    pub fn raw_symbol(&self, name: &str) -> Result<NonNull<c_void>, LibraryError> {
        let cname = CString::new(name).map_err(|_| LibraryError::InvalidName)?;
        let address = self.symbol_impl(&cname);
        debug!(
            target: "cifbind::library",
            library = %self.name,
            symbol = name,
            found = address.is_some(),
            "symbol lookup"
        );
        address.ok_or_else(|| LibraryError::NotFound(name.to_string()))
    }

    #[cfg(unix)]
    fn load_impl(name: &str) -> Result<Self, LibraryError> {
        let cname = CString::new(name).map_err(|_| LibraryError::InvalidName)?;
        let handle = unsafe { libc::dlopen(cname.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };
        let library = Self::from_handle(handle, name, true)?;
        debug!(target: "cifbind::library", library = name, "loaded library");
        Ok(library)
    }

    #[cfg(unix)]
    fn open_self_impl() -> Result<Self, LibraryError> {
        let handle = unsafe { libc::dlopen(core::ptr::null(), libc::RTLD_NOW) };
        Self::from_handle(handle, "<self>", true)
    }

    #[cfg(unix)]
    fn from_handle(handle: *mut c_void, name: &str, owned: bool) -> Result<Self, LibraryError> {
        match NonNull::new(handle) {
            Some(handle) => Ok(Self {
                handle,
                name: name.to_string(),
                owned,
            }),
            None => Err(LibraryError::LoadFailed(last_error())),
        }
    }

    #[cfg(unix)]
    fn symbol_impl(&self, name: &CString) -> Option<NonNull<c_void>> {
        NonNull::new(unsafe { libc::dlsym(self.handle.as_ptr(), name.as_ptr()) })
    }

    #[cfg(windows)]
    fn load_impl(name: &str) -> Result<Self, LibraryError> {
        use std::ffi::OsStr;
        use std::os::windows::ffi::OsStrExt;

        let wide: Vec<u16> = OsStr::new(name).encode_wide().chain(Some(0)).collect();
        if wide[..wide.len() - 1].contains(&0) {
            return Err(LibraryError::InvalidName);
        }

        let handle = unsafe { windows::LoadLibraryW(wide.as_ptr()) };
        let library = Self::from_handle(handle, name, true)?;
        debug!(target: "cifbind::library", library = name, "loaded library");
        Ok(library)
    }

    #[cfg(windows)]
    fn open_self_impl() -> Result<Self, LibraryError> {
        let handle = unsafe { windows::GetModuleHandleW(core::ptr::null()) };
        Self::from_handle(handle, "<self>", false)
    }

    #[cfg(windows)]
    fn from_handle(handle: *mut c_void, name: &str, owned: bool) -> Result<Self, LibraryError> {
        match NonNull::new(handle) {
            Some(handle) => Ok(Self {
                handle,
                name: name.to_string(),
                owned,
            }),
            None => {
                let code = unsafe { windows::GetLastError() };
                Err(LibraryError::LoadFailed(format!("error code {}", code)))
            }
        }
    }

    #[cfg(windows)]
    fn symbol_impl(&self, name: &CString) -> Option<NonNull<c_void>> {
        NonNull::new(unsafe { windows::GetProcAddress(self.handle.as_ptr(), name.as_ptr().cast()) })
    }
}

#[cfg(unix)]
fn last_error() -> String {
    let message = unsafe { libc::dlerror() };
    if message.is_null() {
        "unknown error".to_string()
    } else {
        unsafe { std::ffi::CStr::from_ptr(message) }
            .to_string_lossy()
            .into_owned()
    }
}

#[cfg(windows)]
mod windows {
    use core::ffi::c_void;

    extern "system" {
        pub fn LoadLibraryW(filename: *const u16) -> *mut c_void;
        pub fn GetModuleHandleW(name: *const u16) -> *mut c_void;
        pub fn GetProcAddress(module: *mut c_void, name: *const u8) -> *mut c_void;
        pub fn FreeLibrary(module: *mut c_void) -> i32;
        pub fn GetLastError() -> u32;
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        if !self.owned {
            return;
        }

        #[cfg(unix)]
        unsafe {
            libc::dlclose(self.handle.as_ptr());
        }

        #[cfg(windows)]
        unsafe {
            windows::FreeLibrary(self.handle.as_ptr());
        }
    }
}

impl core::fmt::Debug for Library {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Library")
            .field("name", &self.name)
            .field("handle", &self.handle)
            .finish()
    }
}

// Loader handles are process-global and usable from any thread.
unsafe impl Send for Library {}
unsafe impl Sync for Library {}
