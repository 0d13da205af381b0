use super::Ipam;
use crate::error::{EntityKind, IpamError, Result};
use crate::models::{action, Block, NewChange, NO_BLOCK};
use crate::processing::{
    duplicate_block_name, sanitize, validate_block_name, ValidationError, MAX_INPUT_LENGTH,
};
use crate::store::{Persist, Tables};

fn existing_block(t: &Tables, id: i64) -> Result<Block> {
    t.block(id)
        .cloned()
        .ok_or_else(|| IpamError::not_found(EntityKind::Block, id))
}

fn clean_block_name(name: &str) -> std::result::Result<String, ValidationError> {
    let name = sanitize(name, MAX_INPUT_LENGTH);
    validate_block_name(&name)?;
    Ok(name)
}

impl<P: Persist> Ipam<P> {
    /// Create a block at the end of the display order.
    pub fn add_block(&self, name: &str) -> Result<Block> {
        let name = Self::validated("Add block", || clean_block_name(name))?;
        self.commit(
            "Add block",
            |t| {
                if let Some(conflict) = duplicate_block_name(&t.blocks(), &name, None) {
                    return Err(conflict.into());
                }
                Ok(t.insert_block(&name)?)
            },
            |_, b| {
                NewChange::new(
                    action::ADD_BLOCK,
                    &b.name,
                    format!("Added block '{}'", b.name),
                )
            },
        )
    }

    pub fn rename_block(&self, id: i64, name: &str) -> Result<Block> {
        let name = Self::validated("Rename block", || clean_block_name(name))?;
        let (old_name, block) = self.commit(
            "Rename block",
            |t| {
                let old = existing_block(t, id)?;
                if let Some(conflict) = duplicate_block_name(&t.blocks(), &name, Some(id)) {
                    return Err(conflict.into());
                }
                Ok((old.name, t.rename_block(id, &name)?))
            },
            |_, (old, b)| {
                NewChange::new(
                    action::RENAME_BLOCK,
                    &b.name,
                    format!("Renamed block from '{old}' to '{}'", b.name),
                )
            },
        )?;
        log::debug!("Block {id} renamed from '{old_name}'");
        Ok(block)
    }

    /// Delete a block with all of its containers and subnets.
    pub fn delete_block(&self, id: i64) -> Result<Block> {
        self.commit(
            "Delete block",
            |t| {
                let containers = t.containers_in_block(id).len();
                let subnets = t.subnets_in_block(id).len();
                let block = t
                    .delete_block(id)
                    .map_err(|_| IpamError::not_found(EntityKind::Block, id))?;
                log::debug!(
                    "Block '{}' deleted with {containers} container(s), {subnets} subnet(s)",
                    block.name
                );
                Ok(block)
            },
            |_, b| {
                NewChange::new(
                    action::DELETE_BLOCK,
                    &b.name,
                    format!("Deleted block '{}'", b.name),
                )
            },
        )
    }

    /// Flip the collapsed display state of a block.
    pub fn toggle_collapse(&self, id: i64) -> Result<Block> {
        self.commit(
            "Toggle block",
            |t| {
                let block = existing_block(t, id)?;
                Ok(t.set_block_collapsed(id, !block.collapsed)?)
            },
            |_, b| {
                let state = if b.collapsed { "Collapsed" } else { "Expanded" };
                NewChange::new(
                    action::UPDATE_BLOCK,
                    &b.name,
                    format!("{state} block '{}'", b.name),
                )
            },
        )
    }

    /// Set block positions. Unknown ids are skipped; returns how many blocks moved.
    pub fn reorder_blocks(&self, positions: &[(i64, i64)]) -> Result<usize> {
        self.commit(
            "Reorder blocks",
            |t| {
                let mut moved = 0;
                for &(id, position) in positions {
                    if t.block(id).is_none() {
                        log::debug!("Reorder skips unknown block {id}");
                        continue;
                    }
                    t.set_block_position(id, position)?;
                    moved += 1;
                }
                Ok(moved)
            },
            |t, moved| {
                let order: Vec<String> = t.blocks().into_iter().map(|b| b.name).collect();
                NewChange::new(
                    action::REORDER_BLOCKS,
                    NO_BLOCK,
                    format!("Reordered {moved} block(s): {}", order.join(", ")),
                )
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::error::{EntityKind, IpamError};
    use crate::processing::{ConflictField, ValidationError};
    use crate::service::Ipam;

    #[test]
    fn test_add_block_sanitizes_and_validates() {
        let ipam = Ipam::in_memory(Config::default());
        let block = ipam.add_block("  <b>Production</b> ").unwrap();
        assert_eq!(block.name, "Production");
        assert_eq!(block.position, 1);

        let err = ipam.add_block("x; DROP TABLE block").unwrap_err();
        assert!(matches!(
            err,
            IpamError::Validation(ValidationError::NameSuspiciousPattern(_))
        ));
        let err = ipam.add_block("Production").unwrap_err();
        match err {
            IpamError::Conflict(c) => {
                assert_eq!(c.field, ConflictField::BlockName);
                assert_eq!(c.existing_id(), block.id);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_rename_to_own_name_is_allowed() {
        let ipam = Ipam::in_memory(Config::default());
        let a = ipam.add_block("A").unwrap();
        ipam.add_block("B").unwrap();
        assert_eq!(ipam.rename_block(a.id, "A").unwrap().name, "A");
        assert!(matches!(ipam.rename_block(a.id, "B"), Err(IpamError::Conflict(_))));
        assert!(matches!(
            ipam.rename_block(42, "C"),
            Err(IpamError::NotFound {
                kind: EntityKind::Block,
                id: 42,
            })
        ));
    }

    #[test]
    fn test_toggle_and_reorder() {
        let ipam = Ipam::in_memory(Config::default());
        let a = ipam.add_block("A").unwrap();
        let b = ipam.add_block("B").unwrap();
        assert!(ipam.toggle_collapse(a.id).unwrap().collapsed);
        assert!(!ipam.toggle_collapse(a.id).unwrap().collapsed);

        let moved = ipam
            .reorder_blocks(&[(b.id, 0), (a.id, 5), (99, 1)])
            .unwrap();
        assert_eq!(moved, 2);
        let names: Vec<String> = ipam.blocks().unwrap().into_iter().map(|b| b.name).collect();
        assert_eq!(names, ["B", "A"]);
        assert_eq!(
            ipam.recent_changes().unwrap()[0].details,
            "Reordered 2 block(s): B, A"
        );
    }

    #[test]
    fn test_delete_missing_block_is_not_found() {
        let ipam = Ipam::in_memory(Config::default());
        assert!(matches!(ipam.delete_block(3), Err(IpamError::NotFound { .. })));
        assert!(ipam.recent_changes().unwrap().is_empty());
    }
}
