//! Fixed-point basic operators.
//!
//! 16/32-bit saturating arithmetic in the style of the ITU-T basic operator
//! set. Unlike the reference library there is no global overflow flag: every
//! operator is a pure function and overflow is resolved by saturation.
//! Callers that need to know about overflow use checked arithmetic directly.

/// 16-bit fixed-point word
pub type Word16 = i16;
/// 32-bit fixed-point word
pub type Word32 = i32;

/// Largest 16-bit value
pub const MAX_16: Word16 = i16::MAX;
/// Smallest 16-bit value
pub const MIN_16: Word16 = i16::MIN;
/// Largest 32-bit value
pub const MAX_32: Word32 = i32::MAX;
/// Smallest 32-bit value
pub const MIN_32: Word32 = i32::MIN;

/// Saturate a 32-bit value to the 16-bit range
#[inline]
pub fn saturate(value: Word32) -> Word16 {
    if value > MAX_16 as Word32 {
        MAX_16
    } else if value < MIN_16 as Word32 {
        MIN_16
    } else {
        value as Word16
    }
}

/// Saturating 16-bit subtraction
#[inline]
pub fn sub(var1: Word16, var2: Word16) -> Word16 {
    saturate(var1 as Word32 - var2 as Word32)
}

/// Absolute value, `abs_s(-32768) == 32767`
#[inline]
pub fn abs_s(var1: Word16) -> Word16 {
    if var1 == MIN_16 {
        MAX_16
    } else {
        var1.abs()
    }
}

/// 16-bit shift left with saturation
#[inline]
pub fn shl(var1: Word16, var2: Word16) -> Word16 {
    saturate((var1 as Word32) << var2.clamp(0, 16))
}

/// Q15 multiplication, truncating
#[inline]
pub fn mult(var1: Word16, var2: Word16) -> Word16 {
    saturate((var1 as Word32 * var2 as Word32) >> 15)
}

/// Q15 multiplication with rounding
#[inline]
pub fn mult_r(var1: Word16, var2: Word16) -> Word16 {
    saturate((var1 as Word32 * var2 as Word32 + 0x4000) >> 15)
}

/// 32-bit product of two 16-bit words, shifted left by one
#[inline]
pub fn l_mult(var1: Word16, var2: Word16) -> Word32 {
    let product = var1 as Word32 * var2 as Word32;
    if product == 0x4000_0000 {
        MAX_32
    } else {
        product << 1
    }
}

/// Multiply-accumulate: `l_var3 + l_mult(var1, var2)`
#[inline]
pub fn l_mac(l_var3: Word32, var1: Word16, var2: Word16) -> Word32 {
    l_add(l_var3, l_mult(var1, var2))
}

/// Multiply-subtract: `l_var3 - l_mult(var1, var2)`
#[inline]
pub fn l_msu(l_var3: Word32, var1: Word16, var2: Word16) -> Word32 {
    l_var3.saturating_sub(l_mult(var1, var2))
}

/// Saturating 32-bit addition
#[inline]
pub fn l_add(l_var1: Word32, l_var2: Word32) -> Word32 {
    l_var1.saturating_add(l_var2)
}

/// 32-bit shift left with saturation; negative shifts go right
pub fn l_shl(l_var1: Word32, var2: Word16) -> Word32 {
    if var2 <= 0 {
        return l_shr(l_var1, var2.saturating_neg());
    }
    if l_var1 == 0 {
        return 0;
    }
    if var2 >= 31 {
        return if l_var1 > 0 { MAX_32 } else { MIN_32 };
    }
    let shifted = (l_var1 as i64) << var2;
    if shifted > MAX_32 as i64 {
        MAX_32
    } else if shifted < MIN_32 as i64 {
        MIN_32
    } else {
        shifted as Word32
    }
}

/// 32-bit arithmetic shift right; negative shifts go left
pub fn l_shr(l_var1: Word32, var2: Word16) -> Word32 {
    if var2 < 0 {
        return l_shl(l_var1, var2.saturating_neg());
    }
    if var2 >= 31 {
        if l_var1 < 0 {
            -1
        } else {
            0
        }
    } else {
        l_var1 >> var2
    }
}

/// Upper 16 bits of a 32-bit word
#[inline]
pub fn extract_h(l_var1: Word32) -> Word16 {
    (l_var1 >> 16) as Word16
}

/// Round the upper 16 bits of a 32-bit word
#[inline]
pub fn round(l_var1: Word32) -> Word16 {
    extract_h(l_add(l_var1, 0x8000))
}

/// Number of left shifts needed to normalize a 32-bit word.
///
/// Returns 0 for 0 and 31 for -1.
pub fn norm_l(l_var1: Word32) -> Word16 {
    if l_var1 == 0 {
        return 0;
    }
    if l_var1 == -1 {
        return 31;
    }
    let magnitude = if l_var1 < 0 { !l_var1 } else { l_var1 };
    (magnitude.leading_zeros() as Word16) - 1
}

/// Q15 division of two positive words with `var1 <= var2`.
///
/// Out-of-contract inputs saturate instead of aborting: a non-positive
/// denominator or a numerator not below it gives `MAX_16`, a non-positive
/// numerator gives 0.
pub fn div_s(var1: Word16, var2: Word16) -> Word16 {
    if var1 <= 0 {
        return 0;
    }
    if var2 <= 0 || var1 >= var2 {
        return MAX_16;
    }
    let mut num = var1 as Word32;
    let denom = var2 as Word32;
    let mut out: Word32 = 0;
    for _ in 0..15 {
        out <<= 1;
        num <<= 1;
        if num >= denom {
            num -= denom;
            out += 1;
        }
    }
    out as Word16
}

/// Split a 32-bit word into double-precision `(hi, lo)` parts.
///
/// `l_var = hi << 16 + lo << 1`, with `lo` in `[0, 32767]`.
#[inline]
pub fn l_extract(l_var: Word32) -> (Word16, Word16) {
    let hi = extract_h(l_var);
    let lo = ((l_var - ((hi as Word32) << 16)) >> 1) as Word16;
    (hi, lo)
}

/// Multiply a double-precision word by a Q15 word
#[inline]
pub fn mpy_32_16(hi: Word16, lo: Word16, n: Word16) -> Word32 {
    l_mac(l_mult(hi, n), mult(lo, n), 1)
}
