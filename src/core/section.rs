//! Section manager - organizes a recipe's ingredient lines into named sections.
//!
//! Sections never affect pricing. A section that still owns lines cannot be
//! deleted; lines are never dropped or silently moved. Moving a line is a single
//! per-line update and concurrent edits are last-write-wins.

use crate::{
    core::{
        costing::{PortionedLine, line_cost},
        valuation::IngredientBook,
    },
    entities::{Recipe, RecipeLine, RecipeSection, recipe_line, recipe_section},
    errors::{Error, FieldErrors, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, prelude::*};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Retrieves a recipe's sections in declared order.
pub async fn get_sections_for_recipe<C>(
    db: &C,
    recipe_id: i64,
) -> Result<Vec<recipe_section::Model>>
where
    C: ConnectionTrait,
{
    RecipeSection::find()
        .filter(recipe_section::Column::RecipeId.eq(recipe_id))
        .order_by_asc(recipe_section::Column::Position)
        .order_by_asc(recipe_section::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Appends a new, empty section after the recipe's last one.
///
/// # Errors
/// `Error::Validation` for a blank name, `Error::RecipeNotFound` for an unknown
/// recipe, or the database error.
pub async fn create_section<C>(db: &C, recipe_id: i64, name: &str) -> Result<recipe_section::Model>
where
    C: ConnectionTrait,
{
    validate_section_name(name).into_result()?;

    Recipe::find_by_id(recipe_id)
        .one(db)
        .await?
        .ok_or(Error::RecipeNotFound { id: recipe_id })?;

    let last_position = get_sections_for_recipe(db, recipe_id)
        .await?
        .iter()
        .map(|s| s.position)
        .max();

    let section = recipe_section::ActiveModel {
        recipe_id: Set(recipe_id),
        name: Set(name.trim().to_string()),
        position: Set(last_position.map_or(0, |p| p + 1)),
        ..Default::default()
    };
    let saved = section.insert(db).await?;
    info!(
        "Created section '{}' (ID: {}) for recipe {} at position {}",
        saved.name, saved.id, recipe_id, saved.position
    );
    Ok(saved)
}

/// Renames a section.
pub async fn rename_section<C>(db: &C, section_id: i64, name: &str) -> Result<recipe_section::Model>
where
    C: ConnectionTrait,
{
    validate_section_name(name).into_result()?;

    let mut section: recipe_section::ActiveModel = RecipeSection::find_by_id(section_id)
        .one(db)
        .await?
        .ok_or(Error::SectionNotFound { id: section_id })?
        .into();
    section.name = Set(name.trim().to_string());
    section.update(db).await.map_err(Into::into)
}

/// Deletes an empty section.
///
/// # Errors
/// `Error::Validation` ("section not empty") while any line still references the
/// section; the lines are left untouched.
pub async fn delete_section<C>(db: &C, section_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let section = RecipeSection::find_by_id(section_id)
        .one(db)
        .await?
        .ok_or(Error::SectionNotFound { id: section_id })?;

    let owned_lines = RecipeLine::find()
        .filter(recipe_line::Column::SectionId.eq(section_id))
        .count(db)
        .await?;
    if owned_lines > 0 {
        debug!("Refusing to delete section {section_id}: it owns {owned_lines} lines");
        return Err(Error::Validation(FieldErrors::single(
            "section",
            "section not empty",
        )));
    }

    section.delete(db).await?;
    info!("Deleted section {section_id}");
    Ok(())
}

/// Moves a line into `target_section_id`, or into the unassigned bucket for `None`.
///
/// Idempotent: moving a line to where it already is writes nothing.
///
/// # Errors
/// `Error::LineNotFound`, or `Error::SectionNotFound` when the target does not
/// exist or belongs to another recipe.
pub async fn move_line<C>(
    db: &C,
    line_id: i64,
    target_section_id: Option<i64>,
) -> Result<recipe_line::Model>
where
    C: ConnectionTrait,
{
    let line = RecipeLine::find_by_id(line_id)
        .one(db)
        .await?
        .ok_or(Error::LineNotFound { id: line_id })?;

    if let Some(section_id) = target_section_id {
        RecipeSection::find_by_id(section_id)
            .one(db)
            .await?
            .filter(|s| s.recipe_id == line.recipe_id)
            .ok_or(Error::SectionNotFound { id: section_id })?;
    }

    if line.section_id == target_section_id {
        return Ok(line);
    }

    let mut active: recipe_line::ActiveModel = line.into();
    active.section_id = Set(target_section_id);
    let moved = active.update(db).await?;
    debug!("Moved line {} to section {:?}", moved.id, target_section_id);
    Ok(moved)
}

fn validate_section_name(name: &str) -> FieldErrors {
    if name.trim().is_empty() {
        FieldErrors::single("name", "Section name is required")
    } else {
        FieldErrors::new()
    }
}

/// Which bucket a display group represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKind {
    /// A declared section
    Section {
        /// Section id
        id: i64,
        /// Section name
        name: String,
    },
    /// Lines without a section
    Unassigned,
    /// Lines referencing a section that does not exist
    Recovery,
}

/// A bucket of lines for display.
#[derive(Debug, Clone, PartialEq)]
pub struct LineGroup<L> {
    /// What this bucket is
    pub kind: GroupKind,
    /// Lines in their original relative order
    pub lines: Vec<L>,
}

/// Partitions lines into display groups.
///
/// Declared sections come first (by position, then id) including empty ones,
/// followed by the unassigned bucket. Lines pointing at an unknown section are
/// data-integrity drift: they land in a trailing recovery bucket, which only
/// appears when non-empty, and a warning is logged.
#[must_use]
pub fn group_lines(
    sections: &[recipe_section::Model],
    lines: &[recipe_line::Model],
) -> Vec<LineGroup<recipe_line::Model>> {
    let mut ordered: Vec<&recipe_section::Model> = sections.iter().collect();
    ordered.sort_by_key(|s| (s.position, s.id));
    let known: HashSet<i64> = ordered.iter().map(|s| s.id).collect();

    let mut groups: Vec<LineGroup<recipe_line::Model>> = ordered
        .iter()
        .map(|s| LineGroup {
            kind: GroupKind::Section {
                id: s.id,
                name: s.name.clone(),
            },
            lines: lines
                .iter()
                .filter(|l| l.section_id == Some(s.id))
                .cloned()
                .collect(),
        })
        .collect();

    groups.push(LineGroup {
        kind: GroupKind::Unassigned,
        lines: lines
            .iter()
            .filter(|l| l.section_id.is_none())
            .cloned()
            .collect(),
    });

    let orphans: Vec<recipe_line::Model> = lines
        .iter()
        .filter(|l| l.section_id.is_some_and(|id| !known.contains(&id)))
        .cloned()
        .collect();
    if !orphans.is_empty() {
        for line in &orphans {
            warn!(
                "Line {} references missing section {:?}; placed in recovery bucket",
                line.id, line.section_id
            );
        }
        groups.push(LineGroup {
            kind: GroupKind::Recovery,
            lines: orphans,
        });
    }

    groups
}

impl<L: PortionedLine> LineGroup<L> {
    /// Display subtotal of this group at `servings`. Organizational only.
    #[must_use]
    pub fn subtotal(&self, book: &IngredientBook, servings: i32) -> f64 {
        self.lines
            .iter()
            .filter_map(|l| book.get(l.ingredient_id()).map(|i| line_cost(l, i, servings)))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    fn section(id: i64, name: &str, position: i32) -> recipe_section::Model {
        recipe_section::Model {
            id,
            recipe_id: 1,
            name: name.to_string(),
            position,
        }
    }

    #[test]
    fn test_group_lines_preserves_declared_order() {
        let sections = [section(20, "Garnish", 1), section(10, "Sauce", 0)];
        let lines = [
            line_model(1, 1, 1, Some(20), 0.1),
            line_model(2, 1, 2, None, 0.1),
            line_model(3, 1, 3, Some(10), 0.1),
            line_model(4, 1, 4, Some(20), 0.1),
        ];

        let groups = group_lines(&sections, &lines);
        assert_eq!(groups.len(), 3);
        assert_eq!(
            groups[0].kind,
            GroupKind::Section {
                id: 10,
                name: "Sauce".to_string()
            }
        );
        assert_eq!(groups[0].lines.iter().map(|l| l.id).collect::<Vec<_>>(), vec![3]);
        assert_eq!(groups[1].lines.iter().map(|l| l.id).collect::<Vec<_>>(), vec![1, 4]);
        assert_eq!(groups[2].kind, GroupKind::Unassigned);
        assert_eq!(groups[2].lines.iter().map(|l| l.id).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_group_lines_orphans_go_to_recovery() {
        let sections = [section(10, "Sauce", 0)];
        let lines = [line_model(1, 1, 1, Some(10), 0.1), line_model(2, 1, 2, Some(77), 0.1)];

        let groups = group_lines(&sections, &lines);
        let recovery = groups.last().unwrap();
        assert_eq!(recovery.kind, GroupKind::Recovery);
        assert_eq!(recovery.lines[0].id, 2);

        let total: usize = groups.iter().map(|g| g.lines.len()).sum();
        assert_eq!(total, lines.len());
    }

    #[test]
    fn test_group_subtotals_sum_to_recipe_cost() {
        let book = crate::core::valuation::IngredientBook::new([
            ingredient_model(1, "Tomato", "kg", 2.0, 0.1),
            ingredient_model(2, "Oil", "L", 8.0, 0.0),
        ]);
        let sections = [section(10, "Sauce", 0)];
        let lines = [line_model(1, 1, 1, Some(10), 0.2), line_model(2, 1, 2, None, 0.01)];

        let groups = group_lines(&sections, &lines);
        let subtotal: f64 = groups.iter().map(|g| g.subtotal(&book, 10)).sum();
        let total = crate::core::costing::sum_line_costs(&lines, &book, 10).total;
        assert!((subtotal - total).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_create_section_appends_at_end() -> Result<()> {
        let (db, recipe) = setup_with_recipe().await?;

        let first = create_section(&db, recipe.id, "Base").await?;
        let second = create_section(&db, recipe.id, " Topping ").await?;
        assert_eq!(first.position, 0);
        assert_eq!(second.position, 1);
        assert_eq!(second.name, "Topping");

        let sections = get_sections_for_recipe(&db, recipe.id).await?;
        assert_eq!(sections, vec![first, second]);

        Ok(())
    }

    #[tokio::test]
    async fn test_create_section_validation() -> Result<()> {
        let (db, recipe) = setup_with_recipe().await?;
        let err = create_section(&db, recipe.id, "  ").await.unwrap_err();
        assert!(err.field_errors().unwrap().get("name").is_some());

        let missing = create_section(&db, 999, "Base").await;
        assert!(matches!(missing.unwrap_err(), Error::RecipeNotFound { id: 999 }));
        Ok(())
    }

    #[tokio::test]
    async fn test_rename_section() -> Result<()> {
        let (db, recipe) = setup_with_recipe().await?;
        let section = create_section(&db, recipe.id, "Base").await?;

        let renamed = rename_section(&db, section.id, "Dough").await?;
        assert_eq!(renamed.name, "Dough");
        assert_eq!(renamed.position, section.position);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_non_empty_section_is_rejected() -> Result<()> {
        let (db, recipe, ingredient) = setup_with_recipe_and_ingredient().await?;
        let section = create_section(&db, recipe.id, "Sauce").await?;
        let line = create_test_line(&db, recipe.id, ingredient.id, Some(section.id), 0.2).await?;

        let err = delete_section(&db, section.id).await.unwrap_err();
        assert_eq!(
            err.field_errors().unwrap().get("section"),
            Some("section not empty")
        );

        // The line is untouched and the section still exists
        let reloaded = RecipeLine::find_by_id(line.id).one(&db).await?.unwrap();
        assert_eq!(reloaded, line);
        assert_eq!(get_sections_for_recipe(&db, recipe.id).await?.len(), 1);

        // Once emptied, deletion succeeds
        move_line(&db, line.id, None).await?;
        delete_section(&db, section.id).await?;
        assert!(get_sections_for_recipe(&db, recipe.id).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_move_line_is_idempotent() -> Result<()> {
        let (db, recipe, ingredient) = setup_with_recipe_and_ingredient().await?;
        let section = create_section(&db, recipe.id, "Sauce").await?;
        let line = create_test_line(&db, recipe.id, ingredient.id, None, 0.2).await?;

        move_line(&db, line.id, Some(section.id)).await?;
        let sections = get_sections_for_recipe(&db, recipe.id).await?;
        let once = group_lines(&sections, &crate::core::recipe::get_lines_for_recipe(&db, recipe.id).await?);

        move_line(&db, line.id, Some(section.id)).await?;
        let twice = group_lines(&sections, &crate::core::recipe::get_lines_for_recipe(&db, recipe.id).await?);

        assert_eq!(once, twice);
        assert_eq!(once[0].lines.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_move_line_rejects_foreign_section() -> Result<()> {
        let (db, recipe, ingredient) = setup_with_recipe_and_ingredient().await?;
        let other = create_test_recipe(&db, "Other").await?;
        let foreign = create_section(&db, other.id, "Elsewhere").await?;
        let line = create_test_line(&db, recipe.id, ingredient.id, None, 0.2).await?;

        let result = move_line(&db, line.id, Some(foreign.id)).await;
        assert!(matches!(result.unwrap_err(), Error::SectionNotFound { .. }));

        let missing = move_line(&db, 999, None).await;
        assert!(matches!(missing.unwrap_err(), Error::LineNotFound { id: 999 }));
        Ok(())
    }
}
