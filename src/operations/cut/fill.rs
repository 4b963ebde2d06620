use slotmap::SecondaryMap;
use tracing::debug;

use crate::error::Result;
use crate::mesh::{FaceId, HalfEdgeMesh};

use super::provenance::SideType;

fn side_of(sides: &SecondaryMap<FaceId, SideType>, face: FaceId) -> SideType {
    sides.get(face).copied().unwrap_or_default()
}

/// Spreads [`SideType::Inside`] from classified faces over connected
/// [`SideType::NotConstrained`] faces, then settles every face still open as
/// [`SideType::Outside`].
///
/// Uses an explicit stack, so the depth of a region is unbounded.
///
/// # Errors
///
/// Returns a topology error on broken connectivity.
pub fn flood_fill(mesh: &HalfEdgeMesh, sides: &mut SecondaryMap<FaceId, SideType>) -> Result<()> {
    let faces: Vec<FaceId> = mesh.faces().collect();
    let mut stack = Vec::new();
    let mut filled = 0usize;

    for &seed in &faces {
        if side_of(sides, seed) != SideType::NotConstrained {
            continue;
        }
        let mut touches_inside = false;
        for h in mesh.face_halfedges(seed)? {
            if let Some(neighbour) = mesh.opposite_face(h)? {
                if side_of(sides, neighbour) == SideType::Inside {
                    touches_inside = true;
                    break;
                }
            }
        }
        if !touches_inside {
            continue;
        }

        sides.insert(seed, SideType::Inside);
        filled += 1;
        stack.push(seed);
        while let Some(face) = stack.pop() {
            for h in mesh.face_halfedges(face)? {
                let Some(neighbour) = mesh.opposite_face(h)? else {
                    continue;
                };
                if side_of(sides, neighbour) == SideType::NotConstrained {
                    sides.insert(neighbour, SideType::Inside);
                    filled += 1;
                    stack.push(neighbour);
                }
            }
        }
    }

    let mut settled = 0usize;
    for face in faces {
        if side_of(sides, face) == SideType::NotConstrained {
            sides.insert(face, SideType::Outside);
            settled += 1;
        }
    }

    debug!(filled, settled, "flood filled face sides");
    Ok(())
}
