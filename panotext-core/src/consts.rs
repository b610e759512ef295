/// Default horizontal field of view for a generated perspective view, in degrees.
///
/// 90° keeps rectilinear distortion at the view edges low enough for OCR while
/// covering the sphere with a small number of views.
pub const DEFAULT_FOV_DEG: f32 = 90.0;

/// Default fraction by which adjacent perspective views overlap.
///
/// Text sitting on a view boundary is fully visible in at least one neighbor
/// when views overlap by a quarter of the field of view. The duplicates this
/// produces are removed by spherical deduplication afterwards.
pub const DEFAULT_OVERLAP: f32 = 0.25;

/// Default pitch rows for the view plan, in degrees.
///
/// Street-level text concentrates near the horizon; one ring above and one
/// below catch elevated signage and ground markings.
pub const DEFAULT_PITCH_ROWS: [f32; 3] = [-45.0, 0.0, 45.0];

/// Default edge length of a rendered perspective view, in pixels.
pub const DEFAULT_VIEW_SIZE: u32 = 1024;

/// Minimum confidence for keeping a recognized fragment.
pub const CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Angular IoU threshold above which two spherical detections are merged.
pub const DEDUP_IOU_THRESHOLD: f32 = 0.45;

/// Probability threshold for binarizing the text-detection output map.
pub const DET_BINARY_THRESHOLD: f32 = 0.3;

/// Minimum mean probability inside a component for accepting a text box.
pub const DET_BOX_SCORE_THRESHOLD: f32 = 0.5;

/// Expansion ratio applied to detected text boxes before recognition.
///
/// DBNet-style models shrink text regions during training; the boxes must be
/// unclipped before cropping or characters at the edges are cut off.
pub const DET_UNCLIP_RATIO: f32 = 1.6;

/// Both input sides of the detection model must be multiples of this stride.
pub const DET_STRIDE: u32 = 32;

/// Number of color channels in model input tensors.
pub const INPUT_CHANNELS: usize = 3;

/// Batch size for model inference.
pub const BATCH_SIZE: usize = 1;
