use crate::util::{decode_json, encode_json, from_rfc3339, sql_err, to_rfc3339};
use aw_core::error::ThemeError;
use aw_core::themes::{Theme, ThemeFilter, ThemeRepository};
use aw_core::WatchError;
use rusqlite::{params, Connection, OptionalExtension};

pub struct ThemeRepo<'a> {
    conn: &'a Connection,
}

impl<'a> ThemeRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl<'a> ThemeRepository for ThemeRepo<'a> {
    fn create(&self, theme: Theme) -> Result<Theme, WatchError> {
        self.conn
            .execute(
                "INSERT INTO themes (id, name, description, colors_json, is_public, author_id, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    theme.id,
                    theme.name,
                    theme.description,
                    encode_json(&theme.colors)?,
                    theme.is_public,
                    theme.author_id,
                    to_rfc3339(&theme.created_at),
                    to_rfc3339(&theme.updated_at),
                ],
            )
            .map_err(sql_err)?;
        Ok(theme)
    }

    fn get(&self, id: &str) -> Result<Option<Theme>, WatchError> {
        self.conn
            .query_row(
                "SELECT id, name, description, colors_json, is_public, author_id, created_at, updated_at \
                 FROM themes WHERE id = ?1",
                params![id],
                map_theme_row,
            )
            .optional()
            .map_err(sql_err)?
            .transpose()
    }

    fn search(&self, filter: &ThemeFilter) -> Result<Vec<Theme>, WatchError> {
        let mut sql = String::from(
            "SELECT id, name, description, colors_json, is_public, author_id, created_at, updated_at \
             FROM themes WHERE 1=1",
        );
        let mut params_vec: Vec<rusqlite::types::Value> = Vec::new();
        if let Some(query) = &filter.query {
            sql.push_str(" AND name LIKE ?");
            params_vec.push(format!("%{query}%").into());
        }
        if let Some(is_public) = filter.is_public {
            sql.push_str(" AND is_public = ?");
            params_vec.push(i64::from(is_public).into());
        }
        sql.push_str(" ORDER BY updated_at DESC");

        let mut stmt = self.conn.prepare(&sql).map_err(sql_err)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(params_vec), map_theme_row)
            .map_err(sql_err)?;
        let mut themes = Vec::new();
        for row in rows {
            themes.push(row.map_err(sql_err)??);
        }
        Ok(themes)
    }

    fn update(&self, theme: &Theme) -> Result<Theme, WatchError> {
        let changed = self
            .conn
            .execute(
                "UPDATE themes SET name = ?1, description = ?2, colors_json = ?3, is_public = ?4, updated_at = ?5 \
                 WHERE id = ?6",
                params![
                    theme.name,
                    theme.description,
                    encode_json(&theme.colors)?,
                    theme.is_public,
                    to_rfc3339(&theme.updated_at),
                    theme.id,
                ],
            )
            .map_err(sql_err)?;
        if changed == 0 {
            return Err(ThemeError::NotFound.into());
        }
        Ok(theme.clone())
    }

    fn delete(&self, id: &str) -> Result<(), WatchError> {
        let changed = self
            .conn
            .execute("DELETE FROM themes WHERE id = ?1", params![id])
            .map_err(sql_err)?;
        if changed == 0 {
            return Err(ThemeError::NotFound.into());
        }
        Ok(())
    }
}

fn map_theme_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<Theme, WatchError>> {
    let id: String = row.get(0)?;
    let name: String = row.get(1)?;
    let description: Option<String> = row.get(2)?;
    let colors_json: String = row.get(3)?;
    let is_public: bool = row.get(4)?;
    let author_id: Option<String> = row.get(5)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;

    Ok(decode_theme(
        id,
        name,
        description,
        &colors_json,
        is_public,
        author_id,
        &created_at,
        &updated_at,
    ))
}

#[allow(clippy::too_many_arguments)]
fn decode_theme(
    id: String,
    name: String,
    description: Option<String>,
    colors_json: &str,
    is_public: bool,
    author_id: Option<String>,
    created_at: &str,
    updated_at: &str,
) -> Result<Theme, WatchError> {
    Ok(Theme {
        id,
        name,
        description,
        colors: decode_json(colors_json)?,
        is_public,
        author_id,
        created_at: from_rfc3339(created_at)?,
        updated_at: from_rfc3339(updated_at)?,
    })
}
