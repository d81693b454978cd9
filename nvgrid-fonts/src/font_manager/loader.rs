//! Loading faces out of a `fontdb` database.

use fontdb::{Database, Family, Query};

use super::types::FontData;

/// Load a face of `family` with the given weight and style.
pub(crate) fn load_font_from_db(
    font_db: &Database,
    family: &str,
    weight: fontdb::Weight,
    style: fontdb::Style,
) -> Option<FontData> {
    let query = Query {
        families: &[Family::Name(family)],
        weight,
        style,
        ..Query::default()
    };
    let id = font_db.query(&query)?;
    load_face(font_db, id)
}

/// Load the database's generic monospace face, returning its family name too.
pub(crate) fn load_generic_monospace(font_db: &Database) -> Option<(String, FontData)> {
    let query = Query {
        families: &[Family::Monospace],
        ..Query::default()
    };
    let id = font_db.query(&query)?;
    let family = font_db
        .face(id)
        .and_then(|face| face.families.first())
        .map(|(name, _)| name.clone())?;
    Some((family, load_face(font_db, id)?))
}

fn load_face(font_db: &Database, id: fontdb::ID) -> Option<FontData> {
    font_db
        .with_face_data(id, |data, index| {
            FontData::new_with_index(data.to_vec(), index as usize)
        })
        .flatten()
}
