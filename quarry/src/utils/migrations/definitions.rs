use super::Migration;

/// All catalog migrations, oldest first.
pub static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Mods, mod versions and dependency edges",
        up_sql: "
            CREATE TABLE mod (
                id TEXT NOT NULL PRIMARY KEY,
                name TEXT NOT NULL,
                url TEXT NULL
            );

            CREATE TABLE modversion (
                modid TEXT NOT NULL,
                version TEXT NOT NULL,
                url TEXT NOT NULL,
                packing TEXT NOT NULL,
                hash TEXT NULL,
                filename TEXT NOT NULL,
                PRIMARY KEY (modid, version),
                FOREIGN KEY (modid) REFERENCES mod(id)
            );

            CREATE TABLE moddependency (
                modid TEXT NOT NULL,
                version TEXT NOT NULL,
                depmodid TEXT NOT NULL,
                depversion TEXT NOT NULL,
                PRIMARY KEY (modid, version, depmodid),
                FOREIGN KEY (modid, version) REFERENCES modversion(modid, version),
                FOREIGN KEY (depmodid, depversion) REFERENCES modversion(modid, version)
            );
        ",
    },
    Migration {
        version: 2,
        description: "Per-entry content hashes of downloaded archives",
        up_sql: "
            CREATE TABLE modentryhash (
                modid TEXT NOT NULL,
                version TEXT NOT NULL,
                entryname TEXT NOT NULL,
                hash TEXT NOT NULL,
                PRIMARY KEY (modid, version, entryname),
                FOREIGN KEY (modid, version) REFERENCES modversion(modid, version)
            );
        ",
    },
];
