use crate::commands::Out;
use crate::vocabulary::Vocabulary;
use crate::{Config, Result};

/// Returns the categories, their subcategories and the saving sources that inputs are normalized
/// onto.
pub async fn get_vocabulary(config: &Config) -> Result<Out<Vocabulary>> {
    let vocabulary = config.vocabulary().load().await?;
    let message = format!(
        "The vocabulary has {} categories and {} saving sources",
        vocabulary.categories().len(),
        vocabulary.saving_sources().len()
    );
    Ok(Out::new(message, vocabulary))
}
