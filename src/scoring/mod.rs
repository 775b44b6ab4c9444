//! Review scoring.
//!
//! A review is six independently rated categories. Five of them are summed
//! and halved, the bonus point is added on top, giving an overall score in
//! the range 0.0 to 6.0.

use serde::{Deserialize, Serialize};

/// Weight applied to the sum of the five main categories.
pub const MAIN_CATEGORY_WEIGHT: f64 = 0.5;

/// Highest overall score a valid rating can reach.
pub const MAX_OVERALL_SCORE: f64 = 6.0;

/// A rated category and its inclusive upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Gameplay,
    Graphics,
    Story,
    Audio,
    Innovation,
    Bonus,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Gameplay,
        Category::Graphics,
        Category::Story,
        Category::Audio,
        Category::Innovation,
        Category::Bonus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Gameplay => "gameplay",
            Category::Graphics => "graphics",
            Category::Story => "story",
            Category::Audio => "audio",
            Category::Innovation => "innovation",
            Category::Bonus => "bonus",
        }
    }

    pub fn max(&self) -> u8 {
        match self {
            Category::Gameplay => 3,
            Category::Graphics | Category::Story | Category::Audio => 2,
            Category::Innovation | Category::Bonus => 1,
        }
    }
}

/// Six-category sub-scores underlying the overall score.
///
/// Values come from clients and storage, so they are not assumed to be
/// within bounds. Use [`DetailedRating::validate`] before persisting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedRating {
    #[serde(default)]
    pub gameplay: u8,
    #[serde(default)]
    pub graphics: u8,
    #[serde(default)]
    pub story: u8,
    #[serde(default)]
    pub audio: u8,
    #[serde(default)]
    pub innovation: u8,
    #[serde(default)]
    pub bonus: u8,
}

impl DetailedRating {
    pub fn get(&self, category: Category) -> u8 {
        match category {
            Category::Gameplay => self.gameplay,
            Category::Graphics => self.graphics,
            Category::Story => self.story,
            Category::Audio => self.audio,
            Category::Innovation => self.innovation,
            Category::Bonus => self.bonus,
        }
    }

    fn slot(&mut self, category: Category) -> &mut u8 {
        match category {
            Category::Gameplay => &mut self.gameplay,
            Category::Graphics => &mut self.graphics,
            Category::Story => &mut self.story,
            Category::Audio => &mut self.audio,
            Category::Innovation => &mut self.innovation,
            Category::Bonus => &mut self.bonus,
        }
    }

    /// Set one category, clamping the value to its bound.
    pub fn set(&mut self, category: Category, value: u8) {
        *self.slot(category) = value.min(category.max());
    }

    /// Copy of this rating with every category clamped to its bound.
    pub fn clamped(&self) -> Self {
        let mut rating = *self;
        for category in Category::ALL {
            rating.set(category, self.get(category));
        }
        rating
    }

    /// Returns the first category exceeding its bound, as a message.
    pub fn validate(&self) -> Result<(), String> {
        for category in Category::ALL {
            let value = self.get(category);
            if value > category.max() {
                return Err(format!(
                    "Rating category '{}' must be between 0 and {}, got {}",
                    category.as_str(),
                    category.max(),
                    value
                ));
            }
        }
        debug_assert!(self.overall() <= MAX_OVERALL_SCORE);
        Ok(())
    }

    /// Overall score of this rating.
    pub fn overall(&self) -> f64 {
        let main = u32::from(self.gameplay)
            + u32::from(self.graphics)
            + u32::from(self.story)
            + u32::from(self.audio)
            + u32::from(self.innovation);
        f64::from(main) * MAIN_CATEGORY_WEIGHT + f64::from(self.bonus)
    }
}

/// Overall score for a possibly absent rating. Unreviewed games score 0.
pub fn compute_overall_score(rating: Option<&DetailedRating>) -> f64 {
    rating.map(DetailedRating::overall).unwrap_or(0.0)
}
