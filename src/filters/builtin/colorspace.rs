//! Colour space conversions shared by the colour stages.
//!
//! Pixels are treated as linear sRGB with a D65 white point. Lab and LCh use
//! the CIE 1976 definitions.

/// Linear sRGB to XYZ (D65)
const RGB_TO_XYZ: [[f32; 3]; 3] = [
    [0.412_456_4, 0.357_576_1, 0.180_437_5],
    [0.212_672_9, 0.715_152_2, 0.072_175],
    [0.019_333_9, 0.119_192, 0.950_304_1],
];

/// XYZ (D65) to linear sRGB
const XYZ_TO_RGB: [[f32; 3]; 3] = [
    [3.240_454_2, -1.537_138_5, -0.498_531_4],
    [-0.969_266, 1.876_010_8, 0.041_556],
    [0.055_643_4, -0.204_025_9, 1.057_225_2],
];

/// D65 reference white in XYZ.
const WHITE: [f32; 3] = [0.950_47, 1.0, 1.088_83];

const EPSILON: f32 = 216.0 / 24389.0;
const KAPPA: f32 = 24389.0 / 27.0;

/// Usable range of the Planckian locus approximation, in kelvin. Below
/// about 1900 K the black-body white falls outside the sRGB gamut.
pub const KELVIN_RANGE: (f32, f32) = (2000.0, 12000.0);

#[inline(always)]
fn mat_vec(m: &[[f32; 3]; 3], v: [f32; 3]) -> [f32; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

#[inline(always)]
fn lab_f(t: f32) -> f32 {
    if t > EPSILON {
        t.cbrt()
    } else {
        (KAPPA * t + 16.0) / 116.0
    }
}

#[inline(always)]
fn lab_f_inv(f: f32) -> f32 {
    let cube = f * f * f;
    if cube > EPSILON {
        cube
    } else {
        (116.0 * f - 16.0) / KAPPA
    }
}

/// Linear RGB to CIE Lab.
pub fn rgb_to_lab(rgb: [f32; 3]) -> [f32; 3] {
    let xyz = mat_vec(&RGB_TO_XYZ, rgb);
    let fx = lab_f(xyz[0] / WHITE[0]);
    let fy = lab_f(xyz[1] / WHITE[1]);
    let fz = lab_f(xyz[2] / WHITE[2]);

    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

/// CIE Lab to linear RGB.
pub fn lab_to_rgb(lab: [f32; 3]) -> [f32; 3] {
    let fy = (lab[0] + 16.0) / 116.0;
    let fx = fy + lab[1] / 500.0;
    let fz = fy - lab[2] / 200.0;

    let xyz = [
        lab_f_inv(fx) * WHITE[0],
        lab_f_inv(fy) * WHITE[1],
        lab_f_inv(fz) * WHITE[2],
    ];
    mat_vec(&XYZ_TO_RGB, xyz)
}

/// Lab to LCh(ab); hue in degrees within `[0, 360)`.
pub fn lab_to_lch(lab: [f32; 3]) -> [f32; 3] {
    let chroma = lab[1].hypot(lab[2]);
    let hue = lab[2].atan2(lab[1]).to_degrees().rem_euclid(360.0);
    [lab[0], chroma, hue]
}

/// LCh(ab) to Lab.
pub fn lch_to_lab(lch: [f32; 3]) -> [f32; 3] {
    let (sin, cos) = lch[2].to_radians().sin_cos();
    [lch[0], lch[1] * cos, lch[1] * sin]
}

/// Chromaticity of a black body at `kelvin`, clamped to [`KELVIN_RANGE`].
///
/// Cubic spline fit of the Planckian locus (Kim et al.), with x as a
/// function of temperature and y as a function of x.
pub fn kelvin_to_xy(kelvin: f32) -> (f32, f32) {
    let k = kelvin.clamp(KELVIN_RANGE.0, KELVIN_RANGE.1);
    let t = 1000.0 / k;
    let cubic = |c: [f32; 4], v: f32| ((c[0] * v + c[1]) * v + c[2]) * v + c[3];

    let x = if k <= 4000.0 {
        cubic([-0.266_123_9, -0.234_358_9, 0.877_695_6, 0.179_910], t)
    } else {
        cubic([-3.025_846_9, 2.107_037_9, 0.222_634_7, 0.240_390], t)
    };
    let y = if k <= 2222.0 {
        cubic([-1.106_381_4, -1.348_110_2, 2.185_558_3, -0.202_196_83], x)
    } else if k <= 4000.0 {
        cubic([-0.954_947_6, -1.374_185_9, 2.091_370_2, -0.167_488_67], x)
    } else {
        cubic([3.081_758, -5.873_386_7, 3.751_13, -0.370_014_83], x)
    };

    (x, y)
}

/// Linear RGB of the white produced by a light source at `kelvin`,
/// normalised to unit luminance.
pub fn kelvin_to_rgb(kelvin: f32) -> [f32; 3] {
    let (x, y) = kelvin_to_xy(kelvin);
    let xyz = [x / y, 1.0, (1.0 - x - y) / y];
    mat_vec(&XYZ_TO_RGB, xyz)
}
