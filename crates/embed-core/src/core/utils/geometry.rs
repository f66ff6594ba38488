use nalgebra::{Matrix3, Point3, Vector3};

/// Optimal rigid (or improper) transform mapping a mobile point set onto a reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Superposition {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
    pub rmsd: f64,
}

impl Superposition {
    #[inline]
    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.rotation * point.coords + self.translation)
    }
}

pub fn centroid(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    if points.is_empty() {
        return None;
    }
    let sum: Vector3<f64> = points.iter().map(|p| p.coords).sum();
    Some(Point3::from(sum / points.len() as f64))
}

pub fn radius_of_gyration(points: &[Point3<f64>]) -> Option<f64> {
    let center = centroid(points)?;
    let sum_sq: f64 = points.iter().map(|p| (p - center).norm_squared()).sum();
    Some((sum_sq / points.len() as f64).sqrt())
}

/// RMSD of two index-aligned point sets, without any superposition.
pub fn calculate_rmsd(coords1: &[Point3<f64>], coords2: &[Point3<f64>]) -> Option<f64> {
    if coords1.len() != coords2.len() || coords1.is_empty() {
        return None;
    }
    let n = coords1.len() as f64;
    let squared_dist_sum: f64 = coords1
        .iter()
        .zip(coords2.iter())
        .map(|(p1, p2)| (p1 - p2).norm_squared())
        .sum();
    Some((squared_dist_sum / n).sqrt())
}

/// Kabsch superposition of `mobile` onto `reference`.
///
/// With `allow_reflection` the transform may be improper, which is what
/// distance-only reconstructions need: a configuration and its mirror image
/// have the same distances. Returns `None` for empty or mismatched inputs.
pub fn superpose(
    reference: &[Point3<f64>],
    mobile: &[Point3<f64>],
    allow_reflection: bool,
) -> Option<Superposition> {
    if reference.len() != mobile.len() {
        return None;
    }
    let ref_center = centroid(reference)?;
    let mob_center = centroid(mobile)?;

    let mut covariance = Matrix3::zeros();
    for (p, q) in mobile.iter().zip(reference) {
        covariance += (p - mob_center) * (q - ref_center).transpose();
    }

    let svd = covariance.svd(true, true);
    let u = svd.u?;
    let v = svd.v_t?.transpose();

    let mut correction = Matrix3::identity();
    if !allow_reflection && (v * u.transpose()).determinant() < 0.0 {
        let smallest = svd.singular_values.imin();
        correction[(smallest, smallest)] = -1.0;
    }
    let rotation = v * correction * u.transpose();
    let translation = ref_center.coords - rotation * mob_center.coords;

    let superposition = Superposition {
        rotation,
        translation,
        rmsd: 0.0,
    };
    let moved: Vec<Point3<f64>> = mobile.iter().map(|p| superposition.apply(p)).collect();
    let rmsd = calculate_rmsd(reference, &moved)?;
    Some(Superposition {
        rmsd,
        ..superposition
    })
}
