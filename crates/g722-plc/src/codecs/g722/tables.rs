//! G.722 quantizer, scale-factor and QMF tables
//!
//! Values from ITU-T G.722. The inverse quantizer tables are indexed by the
//! low-band code (`QTAB6`/`QTAB5`/`QTAB4`) or the high-band code (`QTAB2`);
//! the encoder decision tables (`Q6`, `ILN`, `ILP`, `IHN`, `IHP`) are only used
//! by the quantizers in [`super::adpcm`].

/// Transmit/receive QMF coefficients, doubled (`3*2, -11*2, -11*2, 53*2, ...`)
pub const QMF_COEFFS: [i16; 24] = [
    6, -22, -22, 106, 24, -312, 64, 724, -420, -1610, 1902, 7752,
    7752, 1902, -1610, -420, 724, 64, -312, 24, 106, -22, -22, 6
];

/// Initial low-band quantizer scale factor
pub const DETL_INIT: i16 = 32;
/// Initial high-band quantizer scale factor
pub const DETH_INIT: i16 = 8;

/// Low-band reconstruction limits
pub const RLOW_MIN: i32 = -16384;
/// Upper low-band reconstruction limit
pub const RLOW_MAX: i32 = 16383;
/// Upper bound of the low-band log scale factor
pub const NBL_MAX: i32 = 18432;
/// Upper bound of the high-band log scale factor
pub const NBH_MAX: i32 = 22528;

/// 6-bit low-band quantizer decision levels, Q12 relative to `det`
pub const Q6: [i16; 32] = [
    0, 35, 72, 110, 150, 190, 233, 276,
    323, 370, 422, 473, 530, 587, 650, 714,
    786, 858, 940, 1023, 1121, 1219, 1339, 1458,
    1612, 1765, 1980, 2195, 2557, 2919, 0, 0
];

/// Low-band codes for negative differences, by decision interval
pub const ILN: [u8; 32] = [
    0, 63, 62, 31, 30, 29, 28, 27,
    26, 25, 24, 23, 22, 21, 20, 19,
    18, 17, 16, 15, 14, 13, 12, 11,
    10, 9, 8, 7, 6, 5, 4, 0
];

/// Low-band codes for non-negative differences, by decision interval
pub const ILP: [u8; 32] = [
    0, 61, 60, 59, 58, 57, 56, 55,
    54, 53, 52, 51, 50, 49, 48, 47,
    46, 45, 44, 43, 42, 41, 40, 39,
    38, 37, 36, 35, 34, 33, 32, 0
];

/// High-band decision level, Q12 relative to `det`
pub const Q2: i32 = 564;
/// High-band codes for negative differences
pub const IHN: [u8; 3] = [0, 1, 0];
/// High-band codes for non-negative differences
pub const IHP: [u8; 3] = [0, 3, 2];

/// 6-bit inverse quantizer (64 kbit/s)
pub const QTAB6: [i16; 64] = [
    -136, -136, -136, -136, -24808, -21904, -19008, -16704,
    -14984, -13512, -12280, -11192, -10232, -9360, -8576, -7856,
    -7192, -6576, -6000, -5456, -4944, -4464, -4008, -3576,
    -3168, -2776, -2400, -2032, -1688, -1360, -1040, -728,
    24808, 21904, 19008, 16704, 14984, 13512, 12280, 11192,
    10232, 9360, 8576, 7856, 7192, 6576, 6000, 5456,
    4944, 4464, 4008, 3576, 3168, 2776, 2400, 2032,
    1688, 1360, 1040, 728, 432, 136, -432, -136
];

/// 5-bit inverse quantizer (56 kbit/s)
pub const QTAB5: [i16; 32] = [
    -280, -280, -23352, -17560, -14120, -11664, -9752, -8184,
    -6864, -5712, -4696, -3784, -2960, -2208, -1520, -880,
    23352, 17560, 14120, 11664, 9752, 8184, 6864, 5712,
    4696, 3784, 2960, 2208, 1520, 880, 280, -280
];

/// 4-bit inverse quantizer (48 kbit/s, and the predictor feedback path)
pub const QTAB4: [i16; 16] = [
    0, -20456, -12896, -8968, -6288, -4240, -2584, -1200,
    20456, 12896, 8968, 6288, 4240, 2584, 1200, 0
];

/// 2-bit high-band inverse quantizer
pub const QTAB2: [i16; 4] = [
    -7408, -1616, 7408, 1616
];

/// Inverse log-scale table shared by `scalel` and `scaleh`
pub const ILA2: [i16; 353] = [
    8, 8, 8, 8, 8, 8, 8, 8, 
    8, 8, 8, 8, 8, 8, 8, 8, 
    8, 8, 8, 12, 12, 12, 12, 12, 
    12, 12, 12, 12, 12, 12, 12, 12, 
    16, 16, 16, 16, 16, 16, 16, 16, 
    16, 16, 16, 20, 20, 20, 20, 20, 
    20, 20, 20, 24, 24, 24, 24, 24, 
    24, 24, 28, 28, 28, 28, 28, 28, 
    32, 32, 32, 32, 32, 32, 36, 36, 
    36, 36, 36, 40, 40, 40, 40, 44, 
    44, 44, 44, 48, 48, 48, 48, 52, 
    52, 52, 56, 56, 56, 56, 60, 60, 
    64, 64, 64, 68, 68, 68, 72, 72, 
    76, 76, 76, 80, 80, 84, 84, 88, 
    88, 92, 92, 96, 96, 100, 100, 104, 
    104, 108, 112, 112, 116, 116, 120, 124, 
    128, 128, 132, 136, 136, 140, 144, 148, 
    152, 152, 156, 160, 164, 168, 172, 176, 
    180, 184, 188, 192, 196, 200, 204, 208, 
    212, 220, 224, 228, 232, 236, 244, 248, 
    256, 260, 264, 272, 276, 284, 288, 296, 
    304, 308, 316, 324, 332, 336, 344, 352, 
    360, 368, 376, 384, 392, 400, 412, 420, 
    428, 440, 448, 456, 468, 476, 488, 500, 
    512, 520, 532, 544, 556, 568, 580, 592, 
    608, 620, 632, 648, 664, 676, 692, 708, 
    724, 740, 756, 772, 788, 804, 824, 840, 
    860, 880, 896, 916, 936, 956, 980, 1000, 
    1024, 1044, 1068, 1092, 1116, 1140, 1164, 1188, 
    1216, 1244, 1268, 1296, 1328, 1356, 1384, 1416, 
    1448, 1480, 1512, 1544, 1576, 1612, 1648, 1684, 
    1720, 1760, 1796, 1836, 1876, 1916, 1960, 2004, 
    2048, 2092, 2136, 2184, 2232, 2280, 2332, 2380, 
    2432, 2488, 2540, 2596, 2656, 2712, 2772, 2832, 
    2896, 2960, 3024, 3088, 3156, 3228, 3296, 3368, 
    3444, 3520, 3596, 3676, 3756, 3836, 3920, 4008, 
    4096, 4184, 4276, 4372, 4464, 4564, 4664, 4764, 
    4868, 4976, 5084, 5196, 5312, 5428, 5548, 5668, 
    5792, 5920, 6048, 6180, 6316, 6456, 6596, 6740, 
    6888, 7040, 7192, 7352, 7512, 7676, 7844, 8016, 
    8192, 8372, 8556, 8744, 8932, 9128, 9328, 9532, 
    9740, 9956, 10172, 10396, 10624, 10856, 11096, 11336, 
    11584, 11840, 12100, 12364, 12632, 12912, 13192, 13484, 
    13776, 14080, 14388, 14704, 15024, 15352, 15688, 16032, 
    16384
];

/// Low-band log scale factor increments, by `il >> 2`
pub const WLI: [i16; 16] = [
    -60, 3042, 1198, 538, 334, 172, 58, -30,
    3042, 1198, 538, 334, 172, 58, -30, -60
];

/// High-band log scale factor increments, by `ih`
pub const WHI: [i16; 4] = [
    798, -214, 798, -214
];
