//! Schema Descriptor
//!
//! Static description of the sakila movie-rental database. The rendered text is
//! pasted verbatim into every SQL generation prompt, so the layout here is what
//! the model sees.

use lazy_static::lazy_static;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub nullable: bool,
    pub primary_key: bool,
    pub default: Option<&'static str>,
}

impl ColumnSpec {
    const fn new(name: &'static str, sql_type: &'static str) -> Self {
        Self {
            name,
            sql_type,
            nullable: false,
            primary_key: false,
            default: None,
        }
    }

    const fn pk(name: &'static str, sql_type: &'static str) -> Self {
        Self {
            primary_key: true,
            ..Self::new(name, sql_type)
        }
    }

    const fn nullable(name: &'static str, sql_type: &'static str) -> Self {
        Self {
            nullable: true,
            ..Self::new(name, sql_type)
        }
    }

    const fn with_default(name: &'static str, sql_type: &'static str, default: &'static str) -> Self {
        Self {
            default: Some(default),
            ..Self::new(name, sql_type)
        }
    }

    /// `- name (TYPE, PK)` line as it appears in the prompt.
    pub fn render(&self) -> String {
        let mut attrs = vec![self.sql_type.to_string()];
        if self.primary_key {
            attrs.push("PK".to_string());
        }
        if self.nullable {
            attrs.push("NULLABLE".to_string());
        }
        if let Some(default) = self.default {
            attrs.push(format!("DEFAULT '{}'", default));
        }
        format!("- {} ({})", self.name, attrs.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    pub alias: &'static str,
    pub columns: &'static [ColumnSpec],
}

/// Immutable, ordered set of tables. Aliases are unique across the descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaDescriptor {
    pub database: &'static str,
    pub tables: &'static [TableSpec],
}

impl SchemaDescriptor {
    /// The built-in sakila schema, shared for the lifetime of the process.
    pub fn sakila() -> &'static SchemaDescriptor {
        &SAKILA
    }

    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Tables whose name appears as a whole word in `sql`.
    ///
    /// Only a hint for logging; the statement is not parsed.
    pub fn tables_mentioned(&self, sql: &str) -> Vec<&TableSpec> {
        let hits: Vec<&str> = sql
            .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .filter_map(|w| self.table(w))
            .map(|t| t.name)
            .collect();
        self.tables.iter().filter(|t| hits.contains(&t.name)).collect()
    }

    /// Text form used in prompts. The sakila descriptor's text is cached.
    pub fn render(&self) -> String {
        if std::ptr::eq(self, &SAKILA) {
            return SAKILA_TEXT.clone();
        }
        render_descriptor(self)
    }
}

fn render_descriptor(schema: &SchemaDescriptor) -> String {
    let mut out = format!("SCHEMA OF {} DATABASE:\n", schema.database.to_uppercase());
    for table in schema.tables {
        // Writing into a String cannot fail.
        let _ = write!(out, "\nTable: {} ({})\n", table.name, table.alias);
        for column in table.columns {
            out.push_str(&column.render());
            out.push('\n');
        }
    }
    out
}

lazy_static! {
    static ref SAKILA_TEXT: String = render_descriptor(&SAKILA);
}

use ColumnSpec as C;

static SAKILA: SchemaDescriptor = SchemaDescriptor {
    database: "sakila",
    tables: &[
        TableSpec {
            name: "actor",
            alias: "a",
            columns: &[
                C::pk("actor_id", "SMALLINT"),
                C::new("first_name", "VARCHAR(45)"),
                C::new("last_name", "VARCHAR(45)"),
                C::new("last_update", "TIMESTAMP"),
            ],
        },
        TableSpec {
            name: "address",
            alias: "ad",
            columns: &[
                C::pk("address_id", "SMALLINT"),
                C::new("address", "VARCHAR(50)"),
                C::nullable("address2", "VARCHAR(50)"),
                C::new("district", "VARCHAR(20)"),
                C::new("city_id", "SMALLINT"),
                C::nullable("postal_code", "VARCHAR(10)"),
                C::new("phone", "VARCHAR(20)"),
                C::new("location", "GEOMETRY"),
                C::new("last_update", "TIMESTAMP"),
            ],
        },
        TableSpec {
            name: "category",
            alias: "c",
            columns: &[
                C::pk("category_id", "TINYINT"),
                C::new("name", "VARCHAR(25)"),
                C::new("last_update", "TIMESTAMP"),
            ],
        },
        TableSpec {
            name: "city",
            alias: "ci",
            columns: &[
                C::pk("city_id", "SMALLINT"),
                C::new("city", "VARCHAR(50)"),
                C::new("country_id", "SMALLINT"),
                C::new("last_update", "TIMESTAMP"),
            ],
        },
        TableSpec {
            name: "country",
            alias: "co",
            columns: &[
                C::pk("country_id", "SMALLINT"),
                C::new("country", "VARCHAR(50)"),
                C::new("last_update", "TIMESTAMP"),
            ],
        },
        TableSpec {
            name: "customer",
            alias: "cu",
            columns: &[
                C::pk("customer_id", "SMALLINT"),
                C::new("store_id", "TINYINT"),
                C::new("first_name", "VARCHAR(45)"),
                C::new("last_name", "VARCHAR(45)"),
                C::new("email", "VARCHAR(50)"),
                C::new("address_id", "SMALLINT"),
                C::with_default("active", "TINYINT", "1"),
                C::new("create_date", "DATETIME"),
                C::new("last_update", "TIMESTAMP"),
            ],
        },
        TableSpec {
            name: "film",
            alias: "f",
            columns: &[
                C::pk("film_id", "INT"),
                C::new("title", "VARCHAR(255)"),
                C::new("description", "TEXT"),
                C::new("release_year", "YEAR"),
                C::new("language_id", "INT"),
                C::nullable("original_language_id", "INT"),
                C::new("rental_duration", "INT"),
                C::new("rental_rate", "DECIMAL"),
                C::new("length", "INT"),
                C::new("replacement_cost", "DECIMAL"),
                C::new("rating", "VARCHAR(10)"),
                C::new("special_features", "VARCHAR(255)"),
                C::new("last_update", "DATETIME"),
            ],
        },
        TableSpec {
            name: "film_actor",
            alias: "fa",
            columns: &[
                C::pk("actor_id", "SMALLINT"),
                C::pk("film_id", "SMALLINT"),
                C::new("last_update", "TIMESTAMP"),
            ],
        },
        TableSpec {
            name: "film_category",
            alias: "fc",
            columns: &[
                C::pk("film_id", "SMALLINT"),
                C::pk("category_id", "TINYINT"),
                C::new("last_update", "TIMESTAMP"),
            ],
        },
        TableSpec {
            name: "film_text",
            alias: "ft",
            columns: &[
                C::pk("film_id", "SMALLINT"),
                C::new("title", "VARCHAR(255)"),
                C::new("description", "TEXT"),
            ],
        },
        TableSpec {
            name: "inventory",
            alias: "i",
            columns: &[
                C::pk("inventory_id", "MEDIUMINT"),
                C::new("film_id", "SMALLINT"),
                C::new("store_id", "TINYINT"),
                C::new("last_update", "TIMESTAMP"),
            ],
        },
        TableSpec {
            name: "language",
            alias: "l",
            columns: &[
                C::pk("language_id", "TINYINT"),
                C::new("name", "CHAR(20)"),
                C::new("last_update", "TIMESTAMP"),
            ],
        },
        TableSpec {
            name: "payment",
            alias: "p",
            columns: &[
                C::pk("payment_id", "SMALLINT"),
                C::new("customer_id", "SMALLINT"),
                C::new("staff_id", "TINYINT"),
                C::new("rental_id", "INT"),
                C::new("amount", "DECIMAL(5,2)"),
                C::new("payment_date", "DATETIME"),
            ],
        },
        TableSpec {
            name: "rental",
            alias: "r",
            columns: &[
                C::pk("rental_id", "INT"),
                C::new("rental_date", "DATETIME"),
                C::new("inventory_id", "MEDIUMINT"),
                C::new("customer_id", "SMALLINT"),
                C::new("return_date", "DATETIME"),
                C::new("staff_id", "TINYINT"),
                C::new("last_update", "TIMESTAMP"),
            ],
        },
        TableSpec {
            name: "staff",
            alias: "s",
            columns: &[
                C::pk("staff_id", "TINYINT"),
                C::new("first_name", "VARCHAR(45)"),
                C::new("last_name", "VARCHAR(45)"),
                C::new("address_id", "SMALLINT"),
                C::new("picture", "BLOB"),
                C::new("email", "VARCHAR(50)"),
                C::new("store_id", "TINYINT"),
                C::new("active", "TINYINT"),
                C::new("username", "VARCHAR(16)"),
                C::new("password", "VARCHAR(40)"),
                C::new("last_update", "TIMESTAMP"),
            ],
        },
        TableSpec {
            name: "store",
            alias: "st",
            columns: &[
                C::pk("store_id", "TINYINT"),
                C::new("manager_staff_id", "TINYINT"),
                C::new("address_id", "SMALLINT"),
                C::new("last_update", "TIMESTAMP"),
            ],
        },
    ],
};
