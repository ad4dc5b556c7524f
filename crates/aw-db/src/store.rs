use aw_core::store::Store;
use rusqlite::Connection;

use crate::event_repo::EventRepo;
use crate::theme_repo::ThemeRepo;

pub struct DbStore {
    conn: Connection,
}

impl DbStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Store for DbStore {
    type Events<'a>
        = EventRepo<'a>
    where
        Self: 'a;
    type Themes<'a>
        = ThemeRepo<'a>
    where
        Self: 'a;

    fn events(&self) -> Self::Events<'_> {
        EventRepo::new(&self.conn)
    }

    fn themes(&self) -> Self::Themes<'_> {
        ThemeRepo::new(&self.conn)
    }
}
