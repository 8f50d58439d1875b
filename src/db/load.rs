use sqlx::PgConnection;

use crate::model::Tile;

/// Bulk-load tiles with COPY FROM STDIN (text format), `chunk` rows per COPY.
pub(super) async fn copy_tiles(
    conn: &mut PgConnection,
    tiles: &[Tile],
    chunk: usize,
) -> Result<(), sqlx::Error> {
    for rows in tiles.chunks(chunk.max(1)) {
        let mut buf = String::new();
        for t in rows {
            let boundary = serde_json::to_string(&t.boundary).unwrap_or_else(|_| "[]".to_string());
            buf.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
                t.id,
                t.center[0],
                t.center[1],
                t.center[2],
                t.latitude,
                t.longitude,
                t.terrain.as_str(),
                opt_str(t.biome.map(|b| b.as_str())),
                t.fertility,
                t.habitable,
                escape(&boundary),
                int_array(&t.neighbors),
            ));
        }
        copy_in(conn, include_str!("../../sql/copy_tiles.sql"), &buf).await?;
    }
    Ok(())
}

/// Execute a COPY FROM STDIN with the given text-format payload.
async fn copy_in(conn: &mut PgConnection, statement: &str, data: &str) -> Result<(), sqlx::Error> {
    let mut copy = conn.copy_in_raw(statement).await?;
    copy.send(data.as_bytes()).await?;
    copy.finish().await?;
    Ok(())
}

/// Escape a string for Postgres COPY text format.
/// Backslash must be escaped first, then the special whitespace characters.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

/// Render an optional string as a COPY text value (`\N` for NULL).
fn opt_str(v: Option<&str>) -> String {
    match v {
        Some(s) => escape(s),
        None => "\\N".to_string(),
    }
}

/// Postgres array literal, e.g. `{1,2,3}`.
fn int_array(values: &[u32]) -> String {
    let items: Vec<String> = values.iter().map(u32::to_string).collect();
    format!("{{{}}}", items.join(","))
}
