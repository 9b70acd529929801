//! Binary layouts shared between the compiler and the (out-of-scope) C
//! runtime: the array descriptor (spec §3.6), the string descriptor
//! (spec §3.7), and the exception context (spec §4.7).
//!
//! These are declared here, not implemented: no runtime allocates or frees
//! one of these for real. The compiler consults the field offsets when it
//! emits `load`/`store` for a member access or an array element; the
//! layouts exist so that contract is written down exactly once.

/// 48-byte, 8-byte-aligned array descriptor (spec §3.6).
///
/// | Offset | Size | Field |
/// |-------:|:----:|-------|
/// | 0  | 8 | data pointer |
/// | 8  | 8 | lowerBound |
/// | 16 | 8 | upperBound |
/// | 24 | 8 | elementSize |
/// | 32 | 4 | dimensions |
/// | 36 | 4 | base (OPTION BASE 0/1) |
/// | 40 | 1 | typeSuffix |
/// | 41 | 7 | padding |
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ArrayDescriptor {
    pub data: *mut u8,
    pub lower_bound: i64,
    pub upper_bound: i64,
    pub element_size: i64,
    pub dimensions: i32,
    pub base: i32,
    pub type_suffix: u8,
    _padding: [u8; 7],
}

impl ArrayDescriptor {
    pub const SIZE: usize = 48;

    pub const OFFSET_DATA: usize = 0;
    pub const OFFSET_LOWER_BOUND: usize = 8;
    pub const OFFSET_UPPER_BOUND: usize = 16;
    pub const OFFSET_ELEMENT_SIZE: usize = 24;
    pub const OFFSET_DIMENSIONS: usize = 32;
    pub const OFFSET_BASE: usize = 36;
    pub const OFFSET_TYPE_SUFFIX: usize = 40;

    /// Element address is `data + (index - lowerBound) * elementSize`
    /// (spec §3.6). Returns `None` when `index` is outside
    /// `[lowerBound, upperBound]`, matching the `BOUNDS` runtime error.
    pub fn checked_element_offset(&self, index: i64) -> Option<i64> {
        if index < self.lower_bound || index > self.upper_bound {
            return None;
        }
        Some((index - self.lower_bound) * self.element_size)
    }
}

/// A reference-counted string descriptor (spec §3.7). `STRING` and
/// `UNICODE` share this layout; only the runtime's choice of ASCII-byte
/// vs UTF-32 storage for the backing buffer differs, which is invisible
/// at the IL level (string values are always `l` in QBE).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct StringDescriptor {
    /// Pointer to UTF-32 codepoints.
    pub codepoints: *mut u32,
    /// Length in codepoints.
    pub length: i64,
    pub capacity: i64,
    pub refcount: i64,
    pub dirty: bool,
    /// Lazily populated UTF-8 cache pointer, null until first requested.
    pub utf8_cache: *mut u8,
}

/// A runtime exception context (spec §4.7): a setjmp buffer, a link to
/// the enclosing context, and the fields populated on throw. Contexts
/// form a stack; `THROW` calls `longjmp` on the topmost.
///
/// `jmp_buf` is an opaque, platform-sized byte buffer: the real
/// `setjmp`/`longjmp` buffer layout is part of the runtime collaborator,
/// not this compiler's concern, so it is never interpreted here.
#[repr(C)]
pub struct ExceptionContext {
    pub jmp_buf: [u8; 192],
    pub previous: *mut ExceptionContext,
    pub has_finally: bool,
    pub code: i32,
    pub message: *const u8,
    pub line: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_descriptor_matches_spec_layout() {
        assert_eq!(std::mem::size_of::<ArrayDescriptor>(), ArrayDescriptor::SIZE);
        assert_eq!(std::mem::align_of::<ArrayDescriptor>(), 8);
        assert_eq!(
            std::mem::offset_of!(ArrayDescriptor, lower_bound),
            ArrayDescriptor::OFFSET_LOWER_BOUND
        );
        assert_eq!(
            std::mem::offset_of!(ArrayDescriptor, type_suffix),
            ArrayDescriptor::OFFSET_TYPE_SUFFIX
        );
    }

    #[test]
    fn element_offset_respects_bounds_and_base() {
        let desc = ArrayDescriptor {
            data: std::ptr::null_mut(),
            lower_bound: 1,
            upper_bound: 10,
            element_size: 4,
            dimensions: 1,
            base: 1,
            type_suffix: b'%',
            _padding: [0; 7],
        };
        assert_eq!(desc.checked_element_offset(1), Some(0));
        assert_eq!(desc.checked_element_offset(5), Some(16));
        assert_eq!(desc.checked_element_offset(0), None);
        assert_eq!(desc.checked_element_offset(11), None);
    }
}
