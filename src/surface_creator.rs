//! Builds [`Surface`] objects from parsed surface-card mnemonics and registers them.
//!
//! Grounded on `original_source/core/geometry/surfacecreator.hpp` and the per-primitive
//! `create*` factories (`Sphere::createSphere`, `Cone::createCone`, etc.) each surface
//! module exposes as free functions here instead of a static factory method, since Rust
//! has no virtual-constructor idiom to mirror.

use crate::error::{GeomError, Location};
use crate::registry::SurfaceRegistry;
use crate::surface::{Cone, Cylinder, Plane, Quadric, Sphere, Surface, Torus};
use crate::transform::TransformMap;
use crate::vecmath::{Matrix4, Point};

/// One surface card's mnemonic and numeric parameters, already split out of the raw
/// deck line by the (out-of-scope, §1) tokenisation layer.
pub struct SurfaceCard {
    pub id: i32,
    pub name: String,
    pub mnemonic: String,
    pub params: Vec<f64>,
    /// `Some(trn)` if the card carried a leading transform-id field.
    pub transform_id: Option<u32>,
    pub location: Location,
}

/// Builds the primitive named by `mnemonic` from `params`, pre-transformed by
/// `tr_matrix` if the card referenced one. Mnemonics follow the MCNP/PHITS surface-card
/// vocabulary (`P`/`PX`/`PY`/`PZ`, `S`/`SO`/`SX`/`SY`/`SZ`, `C/X`/`C/Y`/`C/Z`/`CX`/`CY`/`CZ`,
/// `K/X`/`K/Y`/`K/Z`, `SQ`, `GQ`).
pub fn build_surface(card: &SurfaceCard, tr_matrix: Option<&Matrix4>) -> Result<Surface, GeomError> {
    let p = &card.params;
    let need = |n: usize| -> Result<(), GeomError> {
        if p.len() < n {
            Err(GeomError::InvalidSurface {
                name: card.name.clone(),
                location: card.location.clone(),
                hint: "too few parameters for this surface mnemonic",
            })
        } else {
            Ok(())
        }
    };

    let mut surface = match card.mnemonic.to_ascii_uppercase().as_str() {
        "P" => {
            need(4)?;
            Surface::Plane(Plane::new(Point::new(p[0], p[1], p[2]), p[3]))
        }
        "PX" => {
            need(1)?;
            Surface::Plane(Plane::new(Point::new(1.0, 0.0, 0.0), p[0]))
        }
        "PY" => {
            need(1)?;
            Surface::Plane(Plane::new(Point::new(0.0, 1.0, 0.0), p[0]))
        }
        "PZ" => {
            need(1)?;
            Surface::Plane(Plane::new(Point::new(0.0, 0.0, 1.0), p[0]))
        }
        "S" => {
            need(4)?;
            Surface::Sphere(Sphere::new(Point::new(p[0], p[1], p[2]), p[3]))
        }
        "SO" => {
            need(1)?;
            Surface::Sphere(Sphere::new(Point::new(0.0, 0.0, 0.0), p[0]))
        }
        "SX" => {
            need(2)?;
            Surface::Sphere(Sphere::new(Point::new(p[0], 0.0, 0.0), p[1]))
        }
        "SY" => {
            need(2)?;
            Surface::Sphere(Sphere::new(Point::new(0.0, p[0], 0.0), p[1]))
        }
        "SZ" => {
            need(2)?;
            Surface::Sphere(Sphere::new(Point::new(0.0, 0.0, p[0]), p[1]))
        }
        "CX" => {
            need(1)?;
            Surface::Cylinder(Cylinder::new(Point::new(0.0, 0.0, 0.0), Point::new(1.0, 0.0, 0.0), p[0]))
        }
        "CY" => {
            need(1)?;
            Surface::Cylinder(Cylinder::new(Point::new(0.0, 0.0, 0.0), Point::new(0.0, 1.0, 0.0), p[0]))
        }
        "CZ" => {
            need(1)?;
            Surface::Cylinder(Cylinder::new(Point::new(0.0, 0.0, 0.0), Point::new(0.0, 0.0, 1.0), p[0]))
        }
        "C/X" => {
            need(3)?;
            Surface::Cylinder(Cylinder::new(Point::new(0.0, p[0], p[1]), Point::new(1.0, 0.0, 0.0), p[2]))
        }
        "C/Y" => {
            need(3)?;
            Surface::Cylinder(Cylinder::new(Point::new(p[0], 0.0, p[1]), Point::new(0.0, 1.0, 0.0), p[2]))
        }
        "C/Z" => {
            need(3)?;
            Surface::Cylinder(Cylinder::new(Point::new(p[0], p[1], 0.0), Point::new(0.0, 0.0, 1.0), p[2]))
        }
        "KX" | "K/X" => {
            need(5)?;
            Surface::Cone(Cone::new(
                Point::new(p[0], p[1], p[2]),
                Point::new(1.0, 0.0, 0.0),
                p[3].sqrt().atan(),
                p.get(4).copied(),
            ))
        }
        "KY" | "K/Y" => {
            need(5)?;
            Surface::Cone(Cone::new(
                Point::new(p[0], p[1], p[2]),
                Point::new(0.0, 1.0, 0.0),
                p[3].sqrt().atan(),
                p.get(4).copied(),
            ))
        }
        "KZ" | "K/Z" => {
            need(5)?;
            Surface::Cone(Cone::new(
                Point::new(p[0], p[1], p[2]),
                Point::new(0.0, 0.0, 1.0),
                p[3].sqrt().atan(),
                p.get(4).copied(),
            ))
        }
        "SQ" => {
            need(10)?;
            Surface::Quadric(Quadric::new(
                p[0], p[1], p[2], 0.0, 0.0, 0.0, p[3] * 2.0, p[4] * 2.0, p[5] * 2.0,
                p[6] * p[6] * p[0] + p[7] * p[7] * p[1] + p[8] * p[8] * p[2] - p[9],
            ))
        }
        "GQ" => {
            need(10)?;
            Surface::Quadric(Quadric::new(p[0], p[1], p[2], p[3], p[4], p[5], p[6], p[7], p[8], p[9]))
        }
        "TX" => {
            need(6)?;
            Surface::Torus(torus_card(p, Point::new(1.0, 0.0, 0.0))?)
        }
        "TY" => {
            need(6)?;
            Surface::Torus(torus_card(p, Point::new(0.0, 1.0, 0.0))?)
        }
        "TZ" => {
            need(6)?;
            Surface::Torus(torus_card(p, Point::new(0.0, 0.0, 1.0))?)
        }
        _ => {
            return Err(GeomError::InvalidSurface {
                name: format!("{} (mnemonic {})", card.name, card.mnemonic),
                location: card.location.clone(),
                hint: "unrecognised surface mnemonic",
            })
        }
    };

    if let Some(matrix) = tr_matrix {
        surface.apply_affine(matrix);
    }
    Ok(surface)
}

/// Builds a `TX`/`TY`/`TZ`-style torus card: `x0 y0 z0 R a b`, an origin plus major
/// radius and minor semi-axes, with the canonical (z-aligned) torus rotated so its
/// symmetry axis points along `axis` (§8 end-to-end scenario 5).
fn torus_card(p: &[f64], axis: Point) -> Result<crate::surface::Torus, GeomError> {
    let center = Point::new(p[0], p[1], p[2]);
    let r_major = p[3];
    let a = p[4];
    let b = p[5];
    if r_major <= 0.0 || a <= 0.0 || b <= 0.0 {
        return Err(GeomError::InvalidSurface {
            name: "torus".into(),
            location: Location::unknown(),
            hint: "torus radii must be strictly positive",
        });
    }
    let rotation = crate::vecmath::rotation_between(&Point::new(0.0, 0.0, 1.0), &axis);
    let to_world = Matrix4::from_rotation_translation(rotation, center);
    Ok(crate::surface::Torus::new(r_major, a, b, to_world))
}

/// Parses and registers every surface card, resolving each card's `transform_id`
/// against `transforms`.
pub fn build_and_register_surfaces(
    registry: &SurfaceRegistry,
    cards: &[SurfaceCard],
    transforms: &TransformMap,
) -> Result<(), GeomError> {
    for card in cards {
        let tr_matrix = match card.transform_id {
            Some(id) => Some(transforms.get(id).ok_or_else(|| GeomError::InvalidTransform {
                name: format!("TR{id}"),
                location: card.location.clone(),
                hint: "surface card references an undeclared transform",
            })?),
            None => None,
        };
        let surface = build_surface(card, tr_matrix)?;
        registry.register(card.id, card.name.clone(), surface, card.location.clone())?;
    }
    Ok(())
}

/// Removes every registered surface not present in `used_ids`, the final pruning stage
/// of the cell-construction pipeline (§4.6 stage 8), matching
/// `SurfaceCreator::removeUnusedSurfaces`.
/// Drops every registered surface not referenced by `used_ids` (§4.3/§4.6 stage 8:
/// `remove_unused(warn)`). When `warn` is set, a pruned surface that was user-authored
/// (came from a deck surface card, not generated internally for a lattice element or a
/// `TRCL` clone) is logged at `warn` level so the author notices an orphaned card;
/// every other pruned surface — auto-generated, or any surface when `warn` is false —
/// is logged at `debug` level only.
pub fn remove_unused_surfaces(registry: &SurfaceRegistry, used_ids: &std::collections::HashSet<i32>, warn: bool) {
    for id in registry.front_ids() {
        if !used_ids.contains(&id) {
            if warn && registry.is_user_authored(id) {
                log::warn!("surface {id} is never referenced by any cell and will be dropped");
            } else {
                log::debug!("pruning unused surface id {id}");
            }
            registry.erase(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SurfaceOps;

    #[test]
    fn pz_builds_plane_through_origin_offset() {
        let card = SurfaceCard {
            id: 1,
            name: "top".into(),
            mnemonic: "PZ".into(),
            params: vec![5.0],
            transform_id: None,
            location: Location::unknown(),
        };
        let surf = build_surface(&card, None).unwrap();
        assert!(matches!(surf, Surface::Plane(_)));
    }

    /// `TX` rotates the canonical z-aligned torus so its symmetry axis is world x,
    /// putting the tube's centerline ring in the world y-z plane (§8 end-to-end
    /// scenario 5). A point on the ring's outer equator is on the surface; just inside
    /// or outside that equator are the forward/reverse halves.
    #[test]
    fn tx_card_builds_torus_with_x_axis_symmetry() {
        let card = SurfaceCard {
            id: 1,
            name: "tx".into(),
            mnemonic: "TX".into(),
            params: vec![0.0, 0.0, 0.0, 10.0, 2.0, 2.0],
            transform_id: None,
            location: Location::unknown(),
        };
        let surf = build_surface(&card, None).unwrap();
        let Surface::Torus(torus) = surf else { panic!("expected a torus") };

        // world x=0 plane holds the ring; y=R+a=12 sits on the outer equator.
        assert!(torus.is_forward(&Point::new(0.0, 13.0, 0.0), false), "just outside the tube should be forward");
        assert!(!torus.is_forward(&Point::new(0.0, 11.0, 0.0), false), "just inside the tube should not be forward");

        // A ray crossing the tube radially (through the ring plane, offset along x)
        // must land on the surface.
        let hit = torus.intersect(&Point::new(0.0, -20.0, 0.0), &Point::new(0.0, 1.0, 0.0));
        assert!(crate::vecmath::is_valid(&hit));
        assert!((hit.y - (-12.0)).abs() < 1.0e-3, "expected hit near y=-12, got {hit:?}");
    }

    #[test]
    fn unknown_mnemonic_is_rejected() {
        let card = SurfaceCard {
            id: 1,
            name: "bad".into(),
            mnemonic: "ZZZ".into(),
            params: vec![],
            transform_id: None,
            location: Location::unknown(),
        };
        assert!(build_surface(&card, None).is_err());
    }

    #[test]
    fn register_and_prune_removes_unreferenced() {
        let reg = SurfaceRegistry::new();
        let cards = vec![
            SurfaceCard {
                id: 1,
                name: "a".into(),
                mnemonic: "PZ".into(),
                params: vec![1.0],
                transform_id: None,
                location: Location::unknown(),
            },
            SurfaceCard {
                id: 2,
                name: "b".into(),
                mnemonic: "PZ".into(),
                params: vec![2.0],
                transform_id: None,
                location: Location::unknown(),
            },
        ];
        let transforms = TransformMap::new();
        build_and_register_surfaces(&reg, &cards, &transforms).unwrap();
        let used: std::collections::HashSet<i32> = [1].into_iter().collect();
        remove_unused_surfaces(&reg, &used, true);
        assert!(reg.contains(1));
        assert!(!reg.contains(2));
    }

    #[test]
    fn prune_does_not_warn_for_auto_generated_surfaces() {
        let reg = SurfaceRegistry::new();
        let auto_id = reg.register_auto(Surface::Plane(Plane::new(Point::new(0.0, 0.0, 1.0), 0.0)));
        remove_unused_surfaces(&reg, &std::collections::HashSet::new(), true);
        assert!(!reg.contains(auto_id));
    }
}
