//! Contact Points
//!
//! A contact is one support vertex of an active collision, identified by
//! `(owning part id, ring index)`. That identity is stable while a pair
//! stays in contact, which lets the velocity solver carry accumulated
//! impulses across steps (warm starting).

use crate::body::BodyId;
use crate::vertices::Vertex;

/// Stable contact identity within a pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContactId {
    /// Id of the part owning the support vertex
    pub body: BodyId,
    /// Ring index of the support vertex
    pub vertex: usize,
}

impl ContactId {
    /// Identity of a support vertex.
    #[inline]
    #[must_use]
    pub fn of(vertex: &Vertex) -> Self {
        Self {
            body: vertex.body,
            vertex: vertex.index,
        }
    }
}

/// A persistent contact point with its accumulated solver impulses.
#[derive(Clone, Copy, Debug)]
pub struct Contact {
    /// Stable identity
    pub id: ContactId,
    /// Current world-space support vertex (refreshed every step)
    pub vertex: Vertex,
    /// Accumulated normal impulse (warm start)
    pub normal_impulse: f64,
    /// Accumulated tangent impulse (warm start)
    pub tangent_impulse: f64,
}

impl Contact {
    /// Create a fresh contact for a support vertex.
    #[must_use]
    pub fn new(vertex: Vertex) -> Self {
        Self {
            id: ContactId::of(&vertex),
            vertex,
            normal_impulse: 0.0,
            tangent_impulse: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;

    #[test]
    fn test_contact_id_from_vertex() {
        let vertex = Vertex {
            position: DVec2::new(1.0, 2.0),
            index: 3,
            body: BodyId(9),
        };
        let contact = Contact::new(vertex);
        assert_eq!(
            contact.id,
            ContactId {
                body: BodyId(9),
                vertex: 3
            }
        );
        assert_eq!(contact.normal_impulse, 0.0);
        assert_eq!(contact.tangent_impulse, 0.0);
    }
}
