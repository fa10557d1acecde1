use super::{Point3, Vector3};

/// Projects `point` onto two in-plane axes, returning `(u, v)`.
#[must_use]
fn project_to_uv(point: &Point3, u_dir: &Vector3, v_dir: &Vector3) -> (f64, f64) {
    (point.coords.dot(u_dir), point.coords.dot(v_dir))
}

/// Point-in-polygon test for a 3D point coplanar with the polygon.
///
/// Projects onto the plane spanned by `u_dir`/`v_dir` and uses the winding
/// number algorithm. Returns `true` if the point is inside or on the boundary.
#[must_use]
pub fn point_in_polygon(point: &Point3, polygon: &[Point3], u_dir: &Vector3, v_dir: &Vector3) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let (px, py) = project_to_uv(point, u_dir, v_dir);
    let uvs: Vec<(f64, f64)> = polygon
        .iter()
        .map(|p| project_to_uv(p, u_dir, v_dir))
        .collect();

    winding_number_2d(px, py, &uvs) != 0 || on_boundary_2d(px, py, &uvs)
}

/// Winding number of point `(px, py)` with respect to polygon `verts`.
///
/// Non-zero => inside, zero => outside.
fn winding_number_2d(px: f64, py: f64, verts: &[(f64, f64)]) -> i32 {
    let n = verts.len();
    let mut winding = 0i32;
    for i in 0..n {
        let (x0, y0) = verts[i];
        let (x1, y1) = verts[(i + 1) % n];

        if y0 <= py {
            if y1 > py && cross_2d(x1 - x0, y1 - y0, px - x0, py - y0) > 0.0 {
                winding += 1;
            }
        } else if y1 <= py && cross_2d(x1 - x0, y1 - y0, px - x0, py - y0) < 0.0 {
            winding -= 1;
        }
    }
    winding
}

fn on_boundary_2d(px: f64, py: f64, verts: &[(f64, f64)]) -> bool {
    const EPS: f64 = 1e-9;
    let n = verts.len();
    (0..n).any(|i| {
        let (x0, y0) = verts[i];
        let (x1, y1) = verts[(i + 1) % n];
        let cross = cross_2d(x1 - x0, y1 - y0, px - x0, py - y0);
        let len = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
        if len < EPS || (cross / len).abs() > EPS {
            return false;
        }
        let t = ((px - x0) * (x1 - x0) + (py - y0) * (y1 - y0)) / (len * len);
        (-EPS..=1.0 + EPS).contains(&t)
    })
}

/// 2D cross product: `(ax * by - ay * bx)`.
#[inline]
fn cross_2d(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    ax * by - ay * bx
}

/// Compute the area of a 3D polygon (coplanar points).
///
/// Uses the cross-product summation method projected along the polygon normal.
#[must_use]
pub fn polygon_area(points: &[Point3], normal: &Vector3) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let n = points.len();
    let mut cross_sum = Vector3::new(0.0, 0.0, 0.0);
    let o = &points[0];
    for i in 1..n {
        let a = points[i] - o;
        let b = points[(i + 1) % n] - o;
        cross_sum += a.cross(&b);
    }
    0.5 * cross_sum.dot(normal).abs()
}

/// Newell normal of a polygon, not normalized.
///
/// Points wound counter-clockwise around the returned vector.
#[must_use]
pub fn polygon_normal(points: &[Point3]) -> Vector3 {
    let n = points.len();
    let mut normal = Vector3::new(0.0, 0.0, 0.0);
    for i in 0..n {
        let curr = &points[i];
        let next = &points[(i + 1) % n];
        normal.x += (curr.y - next.y) * (curr.z + next.z);
        normal.y += (curr.z - next.z) * (curr.x + next.x);
        normal.z += (curr.x - next.x) * (curr.y + next.y);
    }
    normal
}

/// Arithmetic mean of the points, or `None` for an empty slice.
#[must_use]
pub fn centroid(points: &[Point3]) -> Option<Point3> {
    if points.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let inv_n = 1.0 / points.len() as f64;
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Some(Point3::from(sum * inv_n))
}

/// Distance from `point` to the ray `origin + t * dir` (`t >= 0`).
///
/// Returns `(distance, t)`. `dir` must be unit length.
#[must_use]
pub fn ray_point_distance(origin: &Point3, dir: &Vector3, point: &Point3) -> (f64, f64) {
    let t = (point - origin).dot(dir).max(0.0);
    let closest = origin + dir * t;
    ((point - closest).norm(), t)
}

/// Closest approach between the ray `origin + t * dir` and segment `a..b`.
///
/// Returns `(distance, t)` where `t` is the ray parameter of the closest
/// point. `dir` must be unit length.
#[must_use]
pub fn ray_segment_distance(origin: &Point3, dir: &Vector3, a: &Point3, b: &Point3) -> (f64, f64) {
    let seg = b - a;
    let seg_len_sq = seg.norm_squared();
    if seg_len_sq < f64::EPSILON {
        return ray_point_distance(origin, dir, a);
    }

    let w = origin - a;
    let d_dot_s = dir.dot(&seg);
    let denom = seg_len_sq - d_dot_s * d_dot_s;

    // Segment parameter of the closest point to the infinite ray line
    let s = if denom.abs() < f64::EPSILON * seg_len_sq {
        0.0
    } else {
        ((seg.dot(&w) - d_dot_s * dir.dot(&w)) / denom).clamp(0.0, 1.0)
    };
    let on_segment = a + seg * s;
    let (_, t) = ray_point_distance(origin, dir, &on_segment);
    let on_ray = origin + dir * t;

    // Re-project onto the segment from the clamped ray point
    let s = ((on_ray - a).dot(&seg) / seg_len_sq).clamp(0.0, 1.0);
    let on_segment = a + seg * s;
    ((on_ray - on_segment).norm(), t)
}
