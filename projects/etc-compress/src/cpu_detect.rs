//! Helpers for CPU feature detection.

/// Whether the running CPU supports AVX2. Always false off x86.
#[inline]
pub fn has_avx2() -> bool {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        cpufeatures::new!(cpuid_avx2, "avx2");
        cpuid_avx2::get()
    }
    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
    {
        false
    }
}
