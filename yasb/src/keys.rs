// SPDX-License-Identifier: GPL-3.0-or-later

//! Signing key material and curve domain parameters handed to the
//! ECDSA engine.

/// Domain parameters of a short Weierstrass curve over a 256 bit
/// prime field, big endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurveParams {
    pub a: [u8; 32],
    pub b: [u8; 32],
    pub p: [u8; 32],
    pub n: [u8; 32],
    pub gx: [u8; 32],
    pub gy: [u8; 32],
}

/// secp256k1.
pub static SECP256K1: CurveParams = CurveParams {
    a: [0x00; 32],
    b: [
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x07,
    ],
    p: [
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe, 0xff, 0xff,
        0xfc, 0x2f,
    ],
    n: [
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xfe, 0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36,
        0x41, 0x41,
    ],
    gx: [
        0x79, 0xbe, 0x66, 0x7e, 0xf9, 0xdc, 0xbb, 0xac, 0x55, 0xa0, 0x62, 0x95, 0xce, 0x87, 0x0b,
        0x07, 0x02, 0x9b, 0xfc, 0xdb, 0x2d, 0xce, 0x28, 0xd9, 0x59, 0xf2, 0x81, 0x5b, 0x16, 0xf8,
        0x17, 0x98,
    ],
    gy: [
        0x48, 0x3a, 0xda, 0x77, 0x26, 0xa3, 0xc4, 0x65, 0x5d, 0xa4, 0xfb, 0xfc, 0x0e, 0x11, 0x08,
        0xa8, 0xfd, 0x17, 0xb4, 0x48, 0xa6, 0x85, 0x54, 0x19, 0x9c, 0x47, 0xd0, 0x8f, 0xfb, 0x10,
        0xd4, 0xb8,
    ],
};

/// Uncompressed public key of the firmware signing authority, x then y,
/// big endian. Replace this with your own key before shipping.
pub static PUBLIC_KEY: [u8; 64] = [
    0x3a, 0xec, 0xde, 0x7d, 0xac, 0xb9, 0x9b, 0xbc, 0xd9, 0x0b, 0x95, 0xaa, 0xb5, 0x07, 0x94,
    0x9f, 0xf7, 0x37, 0xac, 0x28, 0x14, 0x75, 0x46, 0x64, 0xb0, 0x6a, 0x31, 0x17, 0x24, 0x42,
    0x64, 0x2d, 0xf2, 0xc8, 0xa7, 0xfc, 0x33, 0xa4, 0x5e, 0x41, 0xe2, 0x75, 0x8c, 0x8a, 0xba,
    0x76, 0x57, 0x54, 0x0f, 0xbe, 0x7d, 0x6b, 0xa6, 0x36, 0xda, 0x4b, 0x29, 0x3a, 0xb4, 0xeb,
    0x62, 0xc3, 0x29, 0xa0,
];
