//! State of the star-rating control.
use crate::ratings::MAX_RATING;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarRating {
    max: u8,
    rating: u8,
    hover: u8,
}

impl StarRating {
    pub fn new(rating: u8) -> Self {
        Self::with_max(MAX_RATING, rating)
    }

    pub fn with_max(max: u8, rating: u8) -> Self {
        Self {
            max,
            rating: rating.min(max),
            hover: 0,
        }
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    pub fn rating(&self) -> u8 {
        self.rating
    }

    /// Star positions are 1-based. A star is filled up to the larger of the
    /// hovered position and the committed rating.
    pub fn is_filled(&self, position: u8) -> bool {
        position <= self.hover.max(self.rating)
    }

    pub fn hover(&mut self, position: u8) {
        self.hover = position.min(self.max);
    }

    pub fn leave(&mut self) {
        self.hover = 0;
    }

    pub fn click<F: FnOnce(u8)>(&mut self, value: u8, on_rate: F) {
        self.rating = value.min(self.max);
        on_rate(self.rating);
    }

    pub fn shows_clear(&self) -> bool {
        self.rating > 0
    }

    pub fn clear<F: FnOnce(u8)>(&mut self, on_rate: F) {
        self.click(0, on_rate);
    }
}

pub fn tooltip(value: u8) -> String {
    if value == 1 {
        "Rate 1 star".to_string()
    } else {
        format!("Rate {value} stars")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(stars: &StarRating) -> Vec<bool> {
        (1..=stars.max()).map(|i| stars.is_filled(i)).collect()
    }

    #[test]
    fn fills_up_to_rating() {
        let stars = StarRating::new(3);
        assert_eq!(filled(&stars), vec![true, true, true, false, false]);
    }

    #[test]
    fn hover_previews_and_leave_reverts() {
        let mut stars = StarRating::new(2);
        stars.hover(4);
        assert_eq!(filled(&stars), vec![true, true, true, true, false]);
        stars.leave();
        assert_eq!(filled(&stars), vec![true, true, false, false, false]);
        assert_eq!(stars.rating(), 2);
    }

    #[test]
    fn hovering_below_rating_keeps_rating_filled() {
        let mut stars = StarRating::new(4);
        stars.hover(2);
        assert_eq!(filled(&stars), vec![true, true, true, true, false]);
        stars.hover(5);
        assert_eq!(filled(&stars), vec![true; 5]);
    }

    #[test]
    fn click_commits_and_notifies() {
        let mut stars = StarRating::new(0);
        let mut seen = None;
        stars.click(4, |v| seen = Some(v));
        assert_eq!(seen, Some(4));
        assert_eq!(stars.rating(), 4);
        assert!(stars.shows_clear());
    }

    #[test]
    fn clear_resets_to_zero() {
        let mut stars = StarRating::new(5);
        let mut seen = None;
        stars.clear(|v| seen = Some(v));
        assert_eq!(seen, Some(0));
        assert!(!stars.shows_clear());
        assert_eq!(filled(&stars), vec![false; 5]);
    }

    #[test]
    fn rating_is_capped_at_max() {
        let mut stars = StarRating::new(9);
        assert_eq!(stars.rating(), 5);
        stars.click(7, |_| {});
        assert_eq!(stars.rating(), 5);
    }

    #[test]
    fn tooltip_pluralises() {
        assert_eq!(tooltip(1), "Rate 1 star");
        assert_eq!(tooltip(3), "Rate 3 stars");
    }
}
