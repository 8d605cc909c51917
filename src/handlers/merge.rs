use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use tracing::info;

use super::traits::HandlerError;
use super::types::{ConversionResult, UploadedFile};
use super::validation::allowed_pdf_file;

pub const MERGED_FILENAME: &str = "merged.pdf";

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: &[&[u8]] = &[b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Page trees deeper than this are treated as cyclic
const MAX_TREE_DEPTH: usize = 64;

/// Upper bound on top-level bookmarks walked per source document
const MAX_OUTLINE_ITEMS: usize = 100_000;

/// Concatenate the pages of `uploads`, in order, into one PDF
///
/// Every filename is checked before any file is parsed; the first one without a
/// `.pdf` extension rejects the whole batch.
pub fn merge_pdfs(uploads: &[UploadedFile]) -> Result<ConversionResult, HandlerError> {
    if uploads.is_empty() {
        return Err(HandlerError::EmptyBatch);
    }

    if let Some(rejected) = uploads
        .iter()
        .find(|upload| !allowed_pdf_file(&upload.filename))
    {
        return Err(HandlerError::InvalidFileType(rejected.filename.clone()));
    }

    let documents = uploads
        .iter()
        .map(|upload| Document::load_mem(&upload.data))
        .collect::<Result<Vec<_>, _>>()?;

    let mut merged = assemble(documents)?;
    let page_count = merged.get_pages().len();

    let mut output = Vec::new();
    merged.save_to(&mut output)?;

    info!(files = uploads.len(), pages = page_count, bytes = output.len(), "Merged PDFs");
    Ok(ConversionResult::pdf(output, MERGED_FILENAME))
}

/// Build a fresh document whose single page tree holds every page of `documents`
///
/// Object ids are renumbered so the sources cannot collide. The old catalogs and
/// page-tree nodes are dropped; pages get the attributes they used to inherit
/// copied onto themselves so geometry and resources survive re-parenting. Each
/// source's top-level bookmarks are chained, in order, under one new outline root.
pub fn assemble(documents: Vec<Document>) -> Result<Document, HandlerError> {
    let mut output = Document::with_version("1.5");
    let mut next_id = 1;
    let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();
    let mut outlines: Vec<OutlineSection> = Vec::new();

    for mut document in documents {
        document.renumber_objects_with(next_id);
        next_id = document.max_id + 1;

        for page_id in document.get_pages().into_values() {
            let mut page = document.get_dictionary(page_id)?.clone();
            inherit_attributes(&document, &mut page);
            pages.push((page_id, page));
        }

        let section = OutlineSection::from_document(&document);
        let outline_root = section.as_ref().map(|section| section.root);
        outlines.extend(section);

        output.objects.extend(
            document
                .objects
                .into_iter()
                .filter(|(id, object)| Some(*id) != outline_root && !is_structural(object)),
        );
    }

    output.max_id = next_id - 1;
    let pages_id = output.new_object_id();

    let kids: Vec<Object> = pages.iter().map(|(id, _)| Object::Reference(*id)).collect();
    let count = kids.len() as i64;

    for (id, mut page) in pages {
        page.set("Parent", pages_id);
        output.objects.insert(id, Object::Dictionary(page));
    }

    output.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let mut catalog = dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    };
    if let Some(outlines_id) = link_outlines(&mut output, &outlines) {
        catalog.set("Outlines", outlines_id);
    }
    let catalog_id = output.add_object(catalog);
    output.trailer.set("Root", catalog_id);

    Ok(output)
}

/// Top-level bookmark chain of one source document
#[derive(Debug, Clone, Copy)]
struct OutlineSection {
    root: ObjectId,
    first: ObjectId,
    last: ObjectId,
    count: i64,
}

impl OutlineSection {
    fn from_document(document: &Document) -> Option<Self> {
        let root = document
            .catalog()
            .ok()?
            .get(b"Outlines")
            .and_then(Object::as_reference)
            .ok()?;
        let node = document.get_dictionary(root).ok()?;
        let item = |key: &[u8]| {
            let id = node.get(key).and_then(Object::as_reference).ok()?;
            document.get_dictionary(id).ok().map(|_| id)
        };

        Some(Self {
            root,
            first: item(b"First")?,
            last: item(b"Last")?,
            count: node
                .get(b"Count")
                .and_then(Object::as_i64)
                .map_or(0, i64::abs),
        })
    }
}

/// Hang every section's top-level items off a new outline root
fn link_outlines(output: &mut Document, sections: &[OutlineSection]) -> Option<ObjectId> {
    let (head, tail) = (sections.first()?, sections.last()?);

    let root_id = output.new_object_id();

    for section in sections {
        let mut item = Some(section.first);
        for _ in 0..MAX_OUTLINE_ITEMS {
            let Some(id) = item else { break };
            let Ok(node) = output.get_dictionary_mut(id) else {
                break;
            };
            node.set("Parent", root_id);
            item = if id == section.last {
                None
            } else {
                node.get(b"Next").and_then(Object::as_reference).ok()
            };
        }
    }

    for pair in sections.windows(2) {
        let (previous, next) = (pair[0], pair[1]);
        if let Ok(node) = output.get_dictionary_mut(previous.last) {
            node.set("Next", next.first);
        }
        if let Ok(node) = output.get_dictionary_mut(next.first) {
            node.set("Prev", previous.last);
        }
    }

    let count: i64 = sections.iter().map(|section| section.count).sum();
    output.objects.insert(
        root_id,
        Object::Dictionary(dictionary! {
            "Type" => "Outlines",
            "First" => head.first,
            "Last" => tail.last,
            "Count" => count,
        }),
    );

    Some(root_id)
}

fn inherit_attributes(document: &Document, page: &mut Dictionary) {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();

    for _ in 0..MAX_TREE_DEPTH {
        let Some(node) = parent.and_then(|id| document.get_dictionary(id).ok()) else {
            break;
        };

        for key in INHERITABLE {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key.to_vec(), value.clone());
                }
            }
        }

        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
}

fn type_name(object: &Object) -> Option<&[u8]> {
    let dict = match object {
        Object::Dictionary(dict) => dict,
        Object::Stream(stream) => &stream.dict,
        _ => return None,
    };
    dict.get(b"Type").and_then(Object::as_name).ok()
}

/// Objects rebuilt by [`assemble`] or meaningless in the output
fn is_structural(object: &Object) -> bool {
    matches!(
        type_name(object),
        Some(b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"XRef" | b"ObjStm")
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn media_box(width: i64, height: i64) -> Object {
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(width),
            Object::Integer(height),
        ])
    }

    fn finish(
        mut document: Document,
        pages_id: ObjectId,
        kids: Vec<Object>,
        pages_extra: Dictionary,
        outlines: Option<ObjectId>,
    ) -> Vec<u8> {
        let mut pages = dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        };
        pages.extend(&pages_extra);
        document.objects.insert(pages_id, Object::Dictionary(pages));

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        };
        if let Some(outlines_id) = outlines {
            catalog.set("Outlines", outlines_id);
        }
        let catalog_id = document.add_object(catalog);
        document.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        document.save_to(&mut bytes).unwrap();
        bytes
    }

    /// One blank page per `(width, height)` entry, each with its own MediaBox
    pub(crate) fn blank_pdf(sizes: &[(i64, i64)]) -> Vec<u8> {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();

        let kids = sizes
            .iter()
            .map(|&(width, height)| {
                let page_id = document.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "MediaBox" => media_box(width, height),
                });
                Object::Reference(page_id)
            })
            .collect();

        finish(document, pages_id, kids, Dictionary::new(), None)
    }

    /// One page per title, each with a top-level bookmark pointing at it
    fn outlined_pdf(titles: &[&str]) -> Vec<u8> {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        let root_id = document.new_object_id();

        let page_ids: Vec<ObjectId> = titles
            .iter()
            .map(|_| {
                document.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "MediaBox" => media_box(100, 100),
                })
            })
            .collect();

        let item_ids: Vec<ObjectId> = titles.iter().map(|_| document.new_object_id()).collect();
        for (index, title) in titles.iter().enumerate() {
            let mut item = dictionary! {
                "Title" => Object::string_literal(*title),
                "Parent" => root_id,
                "Dest" => vec![Object::Reference(page_ids[index]), "Fit".into()],
            };
            if index > 0 {
                item.set("Prev", item_ids[index - 1]);
            }
            if let Some(next) = item_ids.get(index + 1) {
                item.set("Next", *next);
            }
            document.objects.insert(item_ids[index], Object::Dictionary(item));
        }

        document.objects.insert(
            root_id,
            Object::Dictionary(dictionary! {
                "Type" => "Outlines",
                "First" => item_ids[0],
                "Last" => item_ids[item_ids.len() - 1],
                "Count" => titles.len() as i64,
            }),
        );

        let kids = page_ids.into_iter().map(Object::Reference).collect();
        finish(document, pages_id, kids, Dictionary::new(), Some(root_id))
    }

    fn reference(node: &Dictionary, key: &[u8]) -> Option<ObjectId> {
        node.get(key).and_then(Object::as_reference).ok()
    }

    fn title(node: &Dictionary) -> String {
        match node.get(b"Title").unwrap() {
            Object::String(bytes, _) => String::from_utf8_lossy(bytes).into_owned(),
            other => panic!("not a string: {other:?}"),
        }
    }

    /// Pages without their own MediaBox, inheriting it from the page tree root
    fn inherited_box_pdf(pages: usize, width: i64, height: i64) -> Vec<u8> {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();

        let kids = (0..pages)
            .map(|_| {
                Object::Reference(document.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                }))
            })
            .collect();

        finish(
            document,
            pages_id,
            kids,
            dictionary! { "MediaBox" => media_box(width, height) },
            None,
        )
    }

    fn number(object: &Object) -> i64 {
        match object {
            Object::Integer(value) => *value,
            Object::Real(value) => *value as i64,
            other => panic!("not a number: {other:?}"),
        }
    }

    /// `(width, height)` of every page, in page order
    pub(crate) fn page_sizes(bytes: &[u8]) -> Vec<(i64, i64)> {
        let document = Document::load_mem(bytes).unwrap();
        document
            .get_pages()
            .into_values()
            .map(|page_id| {
                let page = document.get_dictionary(page_id).unwrap();
                let bounds = page.get(b"MediaBox").unwrap().as_array().unwrap();
                (
                    number(&bounds[2]) - number(&bounds[0]),
                    number(&bounds[3]) - number(&bounds[1]),
                )
            })
            .collect()
    }

    #[test]
    fn merges_in_submission_order() {
        let uploads = vec![
            UploadedFile::new("a.pdf", blank_pdf(&[(100, 100)])),
            UploadedFile::new("b.PDF", blank_pdf(&[(200, 200), (210, 210)])),
            UploadedFile::new("c.pdf", blank_pdf(&[(300, 300)])),
        ];

        let result = merge_pdfs(&uploads).unwrap();

        assert_eq!(result.filename, "merged.pdf");
        assert_eq!(result.mime, mime::APPLICATION_PDF);
        assert_eq!(
            page_sizes(&result.data),
            vec![(100, 100), (200, 200), (210, 210), (300, 300)]
        );
    }

    #[test]
    fn single_file_is_valid_input() {
        let uploads = vec![UploadedFile::new("only.pdf", blank_pdf(&[(50, 80)]))];
        let result = merge_pdfs(&uploads).unwrap();
        assert_eq!(page_sizes(&result.data), vec![(50, 80)]);
    }

    #[test]
    fn inherited_media_box_is_copied_onto_pages() {
        let uploads = vec![
            UploadedFile::new("inherit.pdf", inherited_box_pdf(2, 612, 792)),
            UploadedFile::new("own.pdf", blank_pdf(&[(200, 200)])),
        ];

        let result = merge_pdfs(&uploads).unwrap();
        assert_eq!(
            page_sizes(&result.data),
            vec![(612, 792), (612, 792), (200, 200)]
        );
    }

    #[test]
    fn first_bad_extension_rejects_batch() {
        let uploads = vec![
            UploadedFile::new("a.pdf", blank_pdf(&[(100, 100)])),
            UploadedFile::new("notes.txt", b"hello".to_vec()),
            UploadedFile::new("image.png", b"png".to_vec()),
        ];

        match merge_pdfs(&uploads) {
            Err(HandlerError::InvalidFileType(name)) => assert_eq!(name, "notes.txt"),
            other => panic!("expected InvalidFileType, got {other:?}"),
        }
    }

    #[test]
    fn empty_batch_fails() {
        assert!(matches!(merge_pdfs(&[]), Err(HandlerError::EmptyBatch)));
    }

    #[test]
    fn unparseable_pdf_fails() {
        let uploads = vec![UploadedFile::new("broken.pdf", b"definitely not a pdf".to_vec())];
        assert!(matches!(merge_pdfs(&uploads), Err(HandlerError::Pdf(_))));
    }

    #[test]
    fn bad_extension_wins_over_earlier_corrupt_pdf() {
        let uploads = vec![
            UploadedFile::new("corrupt.pdf", b"not a pdf at all".to_vec()),
            UploadedFile::new("notes.txt", b"hello".to_vec()),
        ];

        match merge_pdfs(&uploads) {
            Err(HandlerError::InvalidFileType(name)) => assert_eq!(name, "notes.txt"),
            other => panic!("expected InvalidFileType, got {other:?}"),
        }
    }

    #[test]
    fn bookmarks_are_chained_under_one_outline_root() {
        let uploads = vec![
            UploadedFile::new("a.pdf", outlined_pdf(&["A1", "A2"])),
            UploadedFile::new("plain.pdf", blank_pdf(&[(200, 200)])),
            UploadedFile::new("c.pdf", outlined_pdf(&["C1"])),
        ];

        let result = merge_pdfs(&uploads).unwrap();
        let merged = Document::load_mem(&result.data).unwrap();

        let roots = merged
            .objects
            .values()
            .filter(|object| type_name(object) == Some(b"Outlines".as_slice()))
            .count();
        assert_eq!(roots, 1);

        let root_id = reference(merged.catalog().unwrap(), b"Outlines").unwrap();
        let root = merged.get_dictionary(root_id).unwrap();
        assert_eq!(root.get(b"Count").unwrap().as_i64().unwrap(), 3);

        let mut titles = Vec::new();
        let mut previous = None;
        let mut item = reference(root, b"First");
        while let Some(id) = item {
            let node = merged.get_dictionary(id).unwrap();
            assert_eq!(reference(node, b"Parent"), Some(root_id));
            assert_eq!(reference(node, b"Prev"), previous);
            titles.push(title(node));
            previous = Some(id);
            item = reference(node, b"Next");
        }

        assert_eq!(titles, vec!["A1", "A2", "C1"]);
        assert_eq!(reference(root, b"Last"), previous);
    }

    #[test]
    fn sources_without_bookmarks_get_no_outline_root() {
        let uploads = vec![
            UploadedFile::new("a.pdf", blank_pdf(&[(100, 100)])),
            UploadedFile::new("b.pdf", blank_pdf(&[(200, 200)])),
        ];

        let result = merge_pdfs(&uploads).unwrap();
        let merged = Document::load_mem(&result.data).unwrap();
        assert!(merged.catalog().unwrap().get(b"Outlines").is_err());
    }
}
