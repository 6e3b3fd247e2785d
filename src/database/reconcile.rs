use std::collections::{HashMap, HashSet};

use super::schema::{Id, IngredientAmount, RecipeIngredient};

/// Changes that turn a recipe's stored ingredient rows into a submitted list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Row ids of join rows whose ingredient is no longer submitted.
    pub delete: Vec<Id>,
    /// (row id, new amount) for rows whose amount changed.
    pub update: Vec<(Id, i32)>,
    pub insert: Vec<IngredientAmount>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.delete.is_empty() && self.update.is_empty() && self.insert.is_empty()
    }
}

/// Three-way diff keyed by ingredient id. `target` is expected to hold unique ids.
pub fn plan(current: &HashMap<Id, RecipeIngredient>, target: &[IngredientAmount]) -> ReconcilePlan {
    let wanted: HashSet<Id> = target.iter().map(|part| part.id).collect();

    let mut delete: Vec<Id> = current
        .iter()
        .filter(|(ingredient_id, _)| !wanted.contains(ingredient_id))
        .map(|(_, row)| row.id)
        .collect();
    delete.sort_unstable();

    let mut update = Vec::new();
    let mut insert = Vec::new();
    for part in target {
        match current.get(&part.id) {
            Some(row) if row.amount != part.amount => update.push((row.id, part.amount)),
            Some(_) => {}
            None => insert.push(*part),
        }
    }

    ReconcilePlan {
        delete,
        update,
        insert,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Id = 10;
    const B: Id = 20;
    const C: Id = 30;

    fn current(rows: &[(Id, Id, i32)]) -> HashMap<Id, RecipeIngredient> {
        rows.iter()
            .map(|&(id, ingredient_id, amount)| {
                (
                    ingredient_id,
                    RecipeIngredient {
                        id,
                        recipe_id: 1,
                        ingredient_id,
                        amount,
                    },
                )
            })
            .collect()
    }

    fn part(id: Id, amount: i32) -> IngredientAmount {
        IngredientAmount { id, amount }
    }

    #[test]
    fn replaces_changes_and_adds() {
        let plan = plan(&current(&[(1, A, 1), (2, B, 2)]), &[part(B, 3), part(C, 4)]);

        assert_eq!(
            plan,
            ReconcilePlan {
                delete: vec![1],
                update: vec![(2, 3)],
                insert: vec![part(C, 4)],
            }
        );
    }

    #[test]
    fn unchanged_amounts_are_left_alone() {
        let plan = plan(&current(&[(1, A, 5), (2, B, 2)]), &[part(A, 5), part(B, 7)]);

        assert!(plan.delete.is_empty());
        assert_eq!(plan.update, vec![(2, 7)]);
        assert!(plan.insert.is_empty());
    }

    #[test]
    fn identical_lists_need_nothing() {
        let plan = plan(&current(&[(1, A, 5)]), &[part(A, 5)]);
        assert!(plan.is_empty());
    }

    #[test]
    fn fresh_recipe_inserts_everything() {
        let plan = plan(&HashMap::new(), &[part(A, 1), part(B, 2)]);

        assert!(plan.delete.is_empty());
        assert!(plan.update.is_empty());
        assert_eq!(plan.insert, vec![part(A, 1), part(B, 2)]);
    }

    #[test]
    fn deletes_are_sorted_by_row() {
        let plan = plan(&current(&[(9, A, 1), (3, B, 1), (6, C, 1)]), &[part(99, 1)]);
        assert_eq!(plan.delete, vec![3, 6, 9]);
    }
}
