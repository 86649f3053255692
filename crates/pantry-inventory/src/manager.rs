use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use pantry_core::{Category, Food};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info, instrument};

use crate::error::{InventoryError, Result};
use crate::types::{validate_name, CategoryInput, FoodInput, Page, PageRequest};

const FOOD_COLUMNS: &str = "f.id, f.name, f.category_id, f.admission_date, c.id, c.name
     FROM foods f LEFT JOIN categories c ON c.id = f.category_id";

/// Thread-safe CRUD manager for foods and categories.
///
/// Wraps a single SQLite connection in a `Mutex`; request handlers share it.
/// The alert pipeline does not use this type, see [`crate::InventoryDb`].
pub struct InventoryManager {
    db: Mutex<Connection>,
}

impl InventoryManager {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── categories ──────────────────────────────────────────────────────────

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let db = self.conn();
        let mut stmt = db.prepare("SELECT id, name FROM categories ORDER BY id")?;
        let rows = stmt.query_map([], row_to_category)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_category(&self, id: i64) -> Result<Category> {
        let db = self.conn();
        db.query_row(
            "SELECT id, name FROM categories WHERE id = ?1",
            [id],
            row_to_category,
        )
        .optional()?
        .ok_or(InventoryError::NotFound {
            entity: "category",
            id,
        })
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub fn create_category(&self, input: &CategoryInput) -> Result<Category> {
        validate_name(&input.name)?;
        let db = self.conn();
        db.execute(
            "INSERT INTO categories (name) VALUES (?1)",
            [input.name.trim()],
        )?;
        let id = db.last_insert_rowid();
        info!(category_id = id, "category created");
        Ok(Category {
            id,
            name: input.name.trim().to_string(),
        })
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub fn update_category(&self, id: i64, input: &CategoryInput) -> Result<Category> {
        validate_name(&input.name)?;
        let db = self.conn();
        let n = db.execute(
            "UPDATE categories SET name = ?1 WHERE id = ?2",
            rusqlite::params![input.name.trim(), id],
        )?;
        if n == 0 {
            return Err(InventoryError::NotFound {
                entity: "category",
                id,
            });
        }
        Ok(Category {
            id,
            name: input.name.trim().to_string(),
        })
    }

    /// Delete a category. Refused while foods still reference it.
    #[instrument(skip(self))]
    pub fn delete_category(&self, id: i64) -> Result<()> {
        let db = self.conn();
        let foods: i64 = db.query_row(
            "SELECT COUNT(*) FROM foods WHERE category_id = ?1",
            [id],
            |row| row.get(0),
        )?;
        if foods > 0 {
            return Err(InventoryError::CategoryInUse { id, foods });
        }
        let n = db.execute("DELETE FROM categories WHERE id = ?1", [id])?;
        if n == 0 {
            return Err(InventoryError::NotFound {
                entity: "category",
                id,
            });
        }
        info!(category_id = id, "category deleted");
        Ok(())
    }

    // ── foods ───────────────────────────────────────────────────────────────

    pub fn list_foods(&self) -> Result<Vec<Food>> {
        let db = self.conn();
        let mut stmt = db.prepare(&format!("SELECT {FOOD_COLUMNS} ORDER BY f.id"))?;
        let rows = stmt.query_map([], row_to_food)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn list_foods_page(&self, req: PageRequest) -> Result<Page<Food>> {
        req.validate()?;
        let db = self.conn();
        let total: i64 = db.query_row("SELECT COUNT(*) FROM foods", [], |row| row.get(0))?;
        let mut stmt = db.prepare(&format!(
            "SELECT {FOOD_COLUMNS} ORDER BY f.id LIMIT ?1 OFFSET ?2"
        ))?;
        let items = stmt
            .query_map(
                rusqlite::params![req.size as i64, req.offset() as i64],
                row_to_food,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Page::new(items, req, total as u64))
    }

    pub fn get_food(&self, id: i64) -> Result<Food> {
        let db = self.conn();
        db.query_row(
            &format!("SELECT {FOOD_COLUMNS} WHERE f.id = ?1"),
            [id],
            row_to_food,
        )
        .optional()?
        .ok_or(InventoryError::NotFound { entity: "food", id })
    }

    #[instrument(skip(self, input), fields(name = %input.name, category_id = input.category_id))]
    pub fn create_food(&self, input: &FoodInput) -> Result<Food> {
        validate_name(&input.name)?;
        let db = self.conn();
        let category = lookup_category(&db, input.category_id)?;
        db.execute(
            "INSERT INTO foods (name, category_id, admission_date) VALUES (?1, ?2, ?3)",
            rusqlite::params![input.name.trim(), input.category_id, input.admission_date],
        )?;
        let id = db.last_insert_rowid();
        info!(food_id = id, "food created");
        Ok(Food {
            id,
            name: input.name.trim().to_string(),
            category_id: input.category_id,
            admission_date: input.admission_date,
            category: Some(category),
        })
    }

    #[instrument(skip(self, input), fields(name = %input.name, category_id = input.category_id))]
    pub fn update_food(&self, id: i64, input: &FoodInput) -> Result<Food> {
        let db = self.conn();
        let exists: bool = db.query_row(
            "SELECT EXISTS(SELECT 1 FROM foods WHERE id = ?1)",
            [id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(InventoryError::NotFound { entity: "food", id });
        }
        validate_name(&input.name)?;
        let category = lookup_category(&db, input.category_id)?;
        db.execute(
            "UPDATE foods SET name = ?1, category_id = ?2, admission_date = ?3 WHERE id = ?4",
            rusqlite::params![
                input.name.trim(),
                input.category_id,
                input.admission_date,
                id
            ],
        )?;
        info!(food_id = id, "food updated");
        Ok(Food {
            id,
            name: input.name.trim().to_string(),
            category_id: input.category_id,
            admission_date: input.admission_date,
            category: Some(category),
        })
    }

    #[instrument(skip(self))]
    pub fn delete_food(&self, id: i64) -> Result<()> {
        let db = self.conn();
        let n = db.execute("DELETE FROM foods WHERE id = ?1", [id])?;
        if n == 0 {
            return Err(InventoryError::NotFound { entity: "food", id });
        }
        info!(food_id = id, "food deleted");
        Ok(())
    }
}

fn lookup_category(db: &Connection, id: i64) -> Result<Category> {
    db.query_row(
        "SELECT id, name FROM categories WHERE id = ?1",
        [id],
        row_to_category,
    )
    .optional()?
    .ok_or(InventoryError::UnknownCategory(id))
}

/// Foods whose admission date lies in `[low, high]`, both ends inclusive.
pub(crate) fn foods_in_date_range(
    db: &Connection,
    low: NaiveDate,
    high: NaiveDate,
) -> Result<Vec<Food>> {
    let mut stmt = db.prepare_cached(&format!(
        "SELECT {FOOD_COLUMNS}
         WHERE f.admission_date >= ?1 AND f.admission_date <= ?2"
    ))?;
    let foods = stmt
        .query_map(rusqlite::params![low, high], row_to_food)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    debug!(%low, %high, count = foods.len(), "date range query");
    Ok(foods)
}

fn row_to_category(row: &rusqlite::Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

/// Map a `FOOD_COLUMNS` row. The category columns are NULL when the
/// reference does not resolve.
fn row_to_food(row: &rusqlite::Row<'_>) -> rusqlite::Result<Food> {
    let category = match (row.get::<_, Option<i64>>(4)?, row.get::<_, Option<String>>(5)?) {
        (Some(id), Some(name)) => Some(Category { id, name }),
        _ => None,
    };
    Ok(Food {
        id: row.get(0)?,
        name: row.get(1)?,
        category_id: row.get(2)?,
        admission_date: row.get(3)?,
        category,
    })
}
