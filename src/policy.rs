//! Gender access policy.
//!
//! Pure predicates deciding which gender categories a user may view and
//! which they may join. Visibility and join eligibility are deliberately
//! separate rules: joining MALE_ONLY/FEMALE_ONLY content is a direct gender
//! match, not derived from the visibility set.

use crate::domain::{Gender, GenderCategory};

/// Categories a user of the given gender may see in listings.
pub fn visible_categories(gender: Gender) -> &'static [GenderCategory] {
    match gender {
        Gender::Male => &[GenderCategory::MaleOnly, GenderCategory::Mixed],
        Gender::Female => &[GenderCategory::FemaleOnly, GenderCategory::Mixed],
    }
}

/// The single-gender category matching the user's own gender. Listing
/// queries filter on `(MIXED, own_category)`.
pub fn own_category(gender: Gender) -> GenderCategory {
    match gender {
        Gender::Male => GenderCategory::MaleOnly,
        Gender::Female => GenderCategory::FemaleOnly,
    }
}

pub fn can_view(gender: Gender, category: GenderCategory) -> bool {
    visible_categories(gender).contains(&category)
}

pub fn can_join(gender: Gender, category: GenderCategory) -> bool {
    match category {
        GenderCategory::Mixed => true,
        GenderCategory::MaleOnly => gender == Gender::Male,
        GenderCategory::FemaleOnly => gender == Gender::Female,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_categories_per_gender() {
        assert_eq!(
            visible_categories(Gender::Male),
            &[GenderCategory::MaleOnly, GenderCategory::Mixed]
        );
        assert_eq!(
            visible_categories(Gender::Female),
            &[GenderCategory::FemaleOnly, GenderCategory::Mixed]
        );
    }

    #[test]
    fn can_join_full_truth_table() {
        for gender in [Gender::Male, Gender::Female] {
            for category in [
                GenderCategory::MaleOnly,
                GenderCategory::FemaleOnly,
                GenderCategory::Mixed,
            ] {
                let expected = category == GenderCategory::Mixed
                    || category == own_category(gender);
                assert_eq!(can_join(gender, category), expected);
            }
        }
    }

    #[test]
    fn female_cannot_join_male_only_but_can_join_mixed() {
        assert!(!can_join(Gender::Female, GenderCategory::MaleOnly));
        assert!(can_join(Gender::Female, GenderCategory::Mixed));
    }

    #[test]
    fn can_view_is_membership_in_visible_set() {
        assert!(can_view(Gender::Male, GenderCategory::MaleOnly));
        assert!(can_view(Gender::Male, GenderCategory::Mixed));
        assert!(!can_view(Gender::Male, GenderCategory::FemaleOnly));
        assert!(!can_view(Gender::Female, GenderCategory::MaleOnly));
    }
}
