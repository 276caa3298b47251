//! Jetons de pagination pour les commandes de liste.
//!
//! Un jeton encode `(hash de la liste, index du premier élément)` sous la
//! forme `"<hash>|<index>"`, rendue en hexadécimal d'octets ASCII. Le hash
//! est celui de la liste au moment de l'appel précédent : s'il ne colle
//! plus, la liste a changé entre deux pages et la requête échoue plutôt
//! que de sauter ou dupliquer des entrées en silence. Un jeton vide
//! signifie « commencer à 0 ».

use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Taille de page par défaut des commandes de liste.
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 200;

/// Erreurs de pagination
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("List has been updated since last page was retrieved")]
    OutdatedPage,

    #[error("Malformed page token: {0}")]
    BadToken(String),
}

/// Position dans une liste paginée.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub list_hash: String,
    pub element: usize,
}

/// Encode un jeton de page. `None` devient le jeton vide.
pub fn page_to_string(page: Option<&Page>) -> String {
    match page {
        None => String::new(),
        Some(page) => hex::encode(format!("{}|{}", page.list_hash, page.element)),
    }
}

/// Décode un jeton de page. Le jeton vide devient `None`.
pub fn string_to_page(token: &str) -> Result<Option<Page>, PageError> {
    if token.is_empty() {
        return Ok(None);
    }
    let bytes = hex::decode(token).map_err(|e| PageError::BadToken(e.to_string()))?;
    let decoded = String::from_utf8(bytes).map_err(|e| PageError::BadToken(e.to_string()))?;
    let (list_hash, element) = decoded
        .split_once('|')
        .ok_or_else(|| PageError::BadToken(format!("missing separator in '{}'", decoded)))?;
    let element = element
        .parse()
        .map_err(|_| PageError::BadToken(format!("bad element index in '{}'", decoded)))?;
    Ok(Some(Page {
        list_hash: list_hash.to_string(),
        element,
    }))
}

/// Découpe la page suivante de `sequence`.
///
/// Retourne la tranche demandée et le jeton de la page d'après (`None`
/// quand la liste est épuisée). Échoue avec [`PageError::OutdatedPage`] si
/// la liste a changé depuis l'émission du jeton.
pub fn page_out<'a, T: Serialize>(
    sequence: &'a [T],
    max_length: usize,
    token: Option<Page>,
) -> Result<(&'a [T], Option<Page>), PageError> {
    let sequence_hash = sequence_hash(sequence);
    let page = token.unwrap_or_else(|| Page {
        list_hash: sequence_hash.clone(),
        element: 0,
    });
    if page.list_hash != sequence_hash {
        return Err(PageError::OutdatedPage);
    }

    let first = page.element.min(sequence.len());
    let next_start = first.saturating_add(max_length).min(sequence.len());
    let next_page = (next_start < sequence.len()).then(|| Page {
        list_hash: sequence_hash,
        element: next_start,
    });
    Ok((&sequence[first..next_start], next_page))
}

/// Hash stable (au sein d'un même processus) du contenu rendu de la liste.
fn sequence_hash<T: Serialize>(sequence: &[T]) -> String {
    let mut hasher = DefaultHasher::new();
    for item in sequence {
        serde_json::to_string(item).unwrap_or_default().hash(&mut hasher);
    }
    format!("{:x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("item-{}", i)).collect()
    }

    #[test]
    fn test_token_round_trip() {
        let page = Page {
            list_hash: "abc123".to_string(),
            element: 42,
        };
        let token = page_to_string(Some(&page));
        // Rendu en hex ASCII uniquement.
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(string_to_page(&token).unwrap(), Some(page));
    }

    #[test]
    fn test_empty_token_means_start() {
        assert_eq!(page_to_string(None), "");
        assert_eq!(string_to_page("").unwrap(), None);
    }

    #[test]
    fn test_bad_tokens() {
        assert!(matches!(string_to_page("zz"), Err(PageError::BadToken(_))));
        let no_separator = hex::encode("no-separator-here");
        assert!(matches!(
            string_to_page(&no_separator),
            Err(PageError::BadToken(_))
        ));
    }

    #[test]
    fn test_page_out_walks_whole_list() {
        let list = items(25);
        let mut collected = Vec::new();
        let mut token = None;
        loop {
            let (page, next) = page_out(&list, 10, token).unwrap();
            collected.extend_from_slice(page);
            match next {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        assert_eq!(collected, list);
    }

    #[test]
    fn test_page_out_single_page() {
        let list = items(3);
        let (page, next) = page_out(&list, 10, None).unwrap();
        assert_eq!(page, &list[..]);
        assert!(next.is_none());
    }

    #[test]
    fn test_page_out_detects_mutation() {
        let list = items(25);
        let (_, next) = page_out(&list, 10, None).unwrap();
        let mut mutated = list.clone();
        mutated.push("item-25".to_string());

        let err = page_out(&mutated, 10, next).unwrap_err();
        assert!(matches!(err, PageError::OutdatedPage));
    }

    #[test]
    fn test_page_out_empty_list() {
        let list: Vec<String> = Vec::new();
        let (page, next) = page_out(&list, 10, None).unwrap();
        assert!(page.is_empty());
        assert!(next.is_none());
    }
}
