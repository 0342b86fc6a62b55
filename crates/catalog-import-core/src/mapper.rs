//! Row mapping: [`RawRow`] + resolved images → [`CatalogDocument`].
//!
//! The mapper works in two steps so the driver can skip rows before doing
//! any network work:
//!
//! 1. [`RowMapper::identify`] checks the mandatory `Name` and `Slug`
//!    columns and returns a [`Skip`] reason if either is missing.
//! 2. [`RowMapper::map`] combines the row with the [`ResolvedImages`] the
//!    driver produced from [`RowMapper::image_sources`].
//!
//! Documents are assembled with [`DocumentBuilder`], which only sets an
//! optional image key when a reference was actually resolved.

use crate::models::{CatalogDocument, ImageRef, RawRow, PRODUCT_TYPE};

/// Recognized CSV header names (case-sensitive).
pub mod columns {
    pub const NAME: &str = "Name";
    pub const SLUG: &str = "Slug";
    pub const POST_SUMMARY: &str = "Post Summary";
    pub const DESCRIPTION: &str = "Description";
    pub const MAIN_IMAGE: &str = "Main Image";
    pub const FEATURED: &str = "Featured?";
    pub const MORE_IMAGES: &str = "More images";
    pub const CATEGORIES: &str = "Categories";
    pub const MOTIF_BACKGROUND_COLOR: &str = "Motif Background Color";
    pub const MOTIF_BACKGROUND: &str = "Motif Background";
}

/// Description candidates, in fallback order.
const DESCRIPTION_COLUMNS: [&str; 2] = [columns::POST_SUMMARY, columns::DESCRIPTION];

/// Default delimiters for the multi-valued `More images` column.
pub const DEFAULT_IMAGE_DELIMITERS: [char; 2] = [',', '|'];

/// Why a row produced no document. Skips are not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    MissingName,
    MissingSlug,
}

impl std::fmt::Display for Skip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Skip::MissingName => write!(f, "missing Name"),
            Skip::MissingSlug => write!(f, "missing Slug"),
        }
    }
}

/// Mandatory identity of an importable row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowIdentity {
    pub name: String,
    pub slug: String,
}

/// Image URLs a row asks the resolver to fetch, in resolution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSources {
    pub main: Option<String>,
    pub more: Vec<String>,
    pub motif_background: Option<String>,
}

impl ImageSources {
    /// Every URL in resolution order: main, more images, motif background.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.main
            .iter()
            .chain(self.more.iter())
            .chain(self.motif_background.iter())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.urls().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolver output for one row, aligned with its [`ImageSources`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedImages {
    pub main: Option<ImageRef>,
    pub more: Vec<Option<ImageRef>>,
    pub motif_background: Option<ImageRef>,
}

/// Maps tokenized rows to catalog documents.
#[derive(Debug, Clone)]
pub struct RowMapper {
    image_delimiters: Vec<char>,
}

impl Default for RowMapper {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_DELIMITERS.to_vec())
    }
}

impl RowMapper {
    pub fn new(image_delimiters: Vec<char>) -> Self {
        Self { image_delimiters }
    }

    /// Check the mandatory columns. A non-empty `Slug` is normalized with
    /// [`slugify`] and kept as written if normalizing leaves nothing.
    pub fn identify(&self, row: &RawRow) -> Result<RowIdentity, Skip> {
        let name = row.value(columns::NAME);
        if name.is_empty() {
            return Err(Skip::MissingName);
        }
        let raw_slug = row.value(columns::SLUG);
        if raw_slug.is_empty() {
            return Err(Skip::MissingSlug);
        }
        let slug = match slugify(raw_slug) {
            s if s.is_empty() => raw_slug.to_string(),
            s => s,
        };
        Ok(RowIdentity {
            name: name.to_string(),
            slug,
        })
    }

    pub fn image_sources(&self, row: &RawRow) -> ImageSources {
        ImageSources {
            main: non_empty(row.value(columns::MAIN_IMAGE)),
            more: split_image_urls(row.value(columns::MORE_IMAGES), &self.image_delimiters),
            motif_background: non_empty(row.value(columns::MOTIF_BACKGROUND)),
        }
    }

    /// Build the document for a row.
    ///
    /// Price is always `0` and `inStock` always `true`: neither is carried
    /// by the export, both are edited later in the admin flow.
    pub fn map(&self, row: &RawRow, images: ResolvedImages) -> Result<CatalogDocument, Skip> {
        let identity = self.identify(row)?;

        let doc = DocumentBuilder::new(identity.name, identity.slug)
            .description(first_non_empty(row, &DESCRIPTION_COLUMNS))
            .category(row.value(columns::CATEGORIES))
            .featured(parse_featured(row.value(columns::FEATURED)))
            .motif_background_color(row.value(columns::MOTIF_BACKGROUND_COLOR))
            .image(images.main)
            .more_images(images.more.into_iter().flatten().collect())
            .motif_background(images.motif_background)
            .build();

        Ok(doc)
    }
}

/// Immutable-style builder for [`CatalogDocument`].
///
/// Every setter consumes the builder and returns a new one, so no partially
/// built document is ever observable.
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    doc: CatalogDocument,
}

impl DocumentBuilder {
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            doc: CatalogDocument {
                doc_type: PRODUCT_TYPE.to_string(),
                name: name.into(),
                slug: slug.into(),
                description: String::new(),
                price: 0.0,
                category: String::new(),
                featured: false,
                in_stock: true,
                image: None,
                more_images: None,
                motif_background_color: String::new(),
                motif_background: None,
            },
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.doc.description = description.into();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.doc.category = category.into();
        self
    }

    pub fn featured(mut self, featured: bool) -> Self {
        self.doc.featured = featured;
        self
    }

    pub fn motif_background_color(mut self, color: impl Into<String>) -> Self {
        self.doc.motif_background_color = color.into();
        self
    }

    pub fn image(mut self, image: Option<ImageRef>) -> Self {
        self.doc.image = image;
        self
    }

    /// Sets `moreImages` only when at least one reference is present.
    pub fn more_images(mut self, images: Vec<ImageRef>) -> Self {
        self.doc.more_images = if images.is_empty() { None } else { Some(images) };
        self
    }

    pub fn motif_background(mut self, image: Option<ImageRef>) -> Self {
        self.doc.motif_background = image;
        self
    }

    pub fn build(self) -> CatalogDocument {
        self.doc
    }
}

/// `true` only for a case-insensitive `"true"`.
pub fn parse_featured(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// Normalize text into a URL-safe slug.
///
/// Lowercases, turns every run of non-alphanumeric characters into a
/// single `-`, and trims leading and trailing dashes. Letters and digits
/// outside ASCII are kept.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Split a multi-valued image column on any of `delimiters`, dropping blanks.
pub fn split_image_urls(value: &str, delimiters: &[char]) -> Vec<String> {
    value
        .split(|c| delimiters.contains(&c))
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

fn first_non_empty<'a>(row: &'a RawRow, candidates: &[&str]) -> &'a str {
    candidates
        .iter()
        .map(|column| row.value(column))
        .find(|value| !value.is_empty())
        .unwrap_or("")
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_missing_name_or_slug_skips() {
        let mapper = RowMapper::default();
        assert_eq!(
            mapper.identify(&row(&[("Name", ""), ("Slug", "mug")])),
            Err(Skip::MissingName)
        );
        assert_eq!(
            mapper.identify(&row(&[("Name", "Mug"), ("Slug", "  ")])),
            Err(Skip::MissingSlug)
        );
        assert_eq!(
            mapper.identify(&row(&[("Name", "Mug"), ("Slug", "---")])).unwrap().slug,
            "---"
        );
        assert_eq!(
            mapper.identify(&row(&[("Slug", "mug")])),
            Err(Skip::MissingName)
        );
    }

    #[test]
    fn test_featured_only_for_true() {
        assert!(parse_featured("true"));
        assert!(parse_featured(" TRUE "));
        assert!(parse_featured("True"));
        for value in ["1", "yes", "", "false", "truthy"] {
            assert!(!parse_featured(value), "{value:?} must not be featured");
        }
    }

    #[test]
    fn test_featured_absent_column_is_false() {
        let doc = RowMapper::default()
            .map(&row(&[("Name", "Mug"), ("Slug", "mug")]), ResolvedImages::default())
            .unwrap();
        assert!(!doc.featured);
    }

    #[test]
    fn test_defaults_for_optional_columns() {
        let doc = RowMapper::default()
            .map(&row(&[("Name", "Mug"), ("Slug", "mug")]), ResolvedImages::default())
            .unwrap();
        assert_eq!(doc.doc_type, "product");
        assert_eq!(doc.price, 0.0);
        assert!(doc.in_stock);
        assert_eq!(doc.category, "");
        assert_eq!(doc.description, "");
        assert_eq!(doc.motif_background_color, "");
        assert!(doc.image.is_none());
        assert!(doc.more_images.is_none());
        assert!(doc.motif_background.is_none());
    }

    #[test]
    fn test_description_fallback_order() {
        let mapper = RowMapper::default();
        let both = row(&[
            ("Name", "Mug"),
            ("Slug", "mug"),
            ("Post Summary", "short"),
            ("Description", "long"),
        ]);
        assert_eq!(
            mapper.map(&both, ResolvedImages::default()).unwrap().description,
            "short"
        );

        let long_only = row(&[
            ("Name", "Mug"),
            ("Slug", "mug"),
            ("Post Summary", ""),
            ("Description", "long"),
        ]);
        assert_eq!(
            mapper
                .map(&long_only, ResolvedImages::default())
                .unwrap()
                .description,
            "long"
        );
    }

    #[test]
    fn test_more_images_drops_unresolved() {
        let images = ResolvedImages {
            main: Some(ImageRef::stored("a")),
            more: vec![None, Some(ImageRef::stored("b")), None],
            motif_background: None,
        };
        let doc = RowMapper::default()
            .map(&row(&[("Name", "Mug"), ("Slug", "mug")]), images)
            .unwrap();
        assert_eq!(doc.image, Some(ImageRef::stored("a")));
        assert_eq!(doc.more_images, Some(vec![ImageRef::stored("b")]));
    }

    #[test]
    fn test_more_images_absent_when_none_resolve() {
        let images = ResolvedImages {
            more: vec![None, None],
            ..Default::default()
        };
        let doc = RowMapper::default()
            .map(&row(&[("Name", "Mug"), ("Slug", "mug")]), images)
            .unwrap();
        assert!(doc.more_images.is_none());
    }

    #[test]
    fn test_image_sources_split_on_delimiters() {
        let r = row(&[
            ("Main Image", "https://cdn.example/a.png"),
            (
                "More images",
                "https://cdn.example/b.png, https://cdn.example/c.png|https://cdn.example/d.png ,",
            ),
            ("Motif Background", ""),
        ]);
        let sources = RowMapper::default().image_sources(&r);
        assert_eq!(sources.main.as_deref(), Some("https://cdn.example/a.png"));
        assert_eq!(sources.more.len(), 3);
        assert_eq!(sources.motif_background, None);
        assert_eq!(sources.len(), 4);

        let pipe_only = RowMapper::new(vec!['|']).image_sources(&r);
        assert_eq!(pipe_only.more.len(), 2);
    }

    #[test]
    fn test_non_ascii_slug_is_kept() {
        let mapper = RowMapper::default();
        let tasse = mapper.identify(&row(&[("Name", "Tasse"), ("Slug", "tässe")])).unwrap();
        assert_eq!(tasse.slug, "tässe");
        let teapot = mapper.identify(&row(&[("Name", "Teekanne"), ("Slug", "茶壶")])).unwrap();
        assert_eq!(teapot.slug, "茶壶");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Blue Mug"), "blue-mug");
        assert_eq!(slugify("  --Hello,  World!-- "), "hello-world");
        assert_eq!(slugify("already-a-slug"), "already-a-slug");
        assert_eq!(slugify("Ünïcode 42"), "ünïcode-42");
        assert_eq!(slugify("Tässe"), "tässe");
        assert_eq!(slugify(""), "");
    }
}
