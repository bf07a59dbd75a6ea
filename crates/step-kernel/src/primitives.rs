//! Fixture solids built with truck's sweep API, and their STEP text.
//!
//! truck has no built-in box primitive, so everything is successive sweeps.

use truck_modeling::builder;
use truck_modeling::topology::Solid;
use truck_modeling::{Point3, Vector3};
use truck_stepio::out::{CompleteStepDisplay, StepHeaderDescriptor, StepModel};

/// Create a box solid via successive translational sweeps.
/// Minimum corner at `origin`, extending by (w,h,d).
pub fn make_box(origin: [f64; 3], w: f64, h: f64, d: f64) -> Solid {
    let v = builder::vertex(Point3::new(origin[0], origin[1], origin[2]));
    let edge = builder::tsweep(&v, Vector3::new(w, 0.0, 0.0));
    let face = builder::tsweep(&edge, Vector3::new(0.0, h, 0.0));
    builder::tsweep(&face, Vector3::new(0.0, 0.0, d))
}

/// Serialize a solid as an AP203-style STEP exchange file.
pub fn to_step_string(solid: &Solid, file_name: &str) -> String {
    let compressed = solid.compress();
    CompleteStepDisplay::new(
        StepModel::from(&compressed),
        StepHeaderDescriptor {
            file_name: file_name.to_owned(),
            ..Default::default()
        },
    )
    .to_string()
}
