use sqlx::PgExecutor;

use super::repository;
use crate::modules::place;

#[derive(Debug)]
pub enum Error {
    UnexpectedError,
}

/// Arithmetic mean of a rating set, 0.0 when there are no ratings yet.
pub fn average_rating(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }

    ratings.iter().map(|&r| r as f64).sum::<f64>() / ratings.len() as f64
}

/// Re-derives the denormalized average from the full review set of the
/// place. Called by the review creation handler after the insert commits;
/// safe to call any number of times.
pub async fn recompute_average<'e, E: PgExecutor<'e> + Copy>(
    e: E,
    place_id: String,
) -> Result<f64, Error> {
    let ratings = repository::ratings_for_place(e, place_id.clone())
        .await
        .map_err(|_| Error::UnexpectedError)?;

    let average = average_rating(&ratings);

    place::repository::update_average_rating(e, place_id, average)
        .await
        .map_err(|_| Error::UnexpectedError)?;

    Ok(average)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_review_set_averages_to_zero() {
        assert_eq!(average_rating(&[]), 0.0);
    }

    #[test]
    fn single_rating_is_its_own_average() {
        assert_eq!(average_rating(&[4]), 4.0);
    }

    #[test]
    fn mean_of_mixed_ratings() {
        assert_eq!(average_rating(&[1, 2, 3, 4, 5]), 3.0);
        assert_eq!(average_rating(&[4, 5]), 4.5);
        assert_eq!(average_rating(&[2, 3]), 2.5);
    }

    #[test]
    fn recomputation_is_stable_for_the_same_set() {
        let ratings = [5, 3, 4, 4];
        assert_eq!(average_rating(&ratings), average_rating(&ratings));
    }
}
