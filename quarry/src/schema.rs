// Diesel table definitions. The DDL itself lives in utils::migrations::definitions.

diesel::table! {
    #[sql_name = "mod"]
    mods (id) {
        id -> Text,
        name -> Text,
        url -> Nullable<Text>,
    }
}

diesel::table! {
    modversion (modid, version) {
        modid -> Text,
        version -> Text,
        url -> Text,
        packing -> Text,
        hash -> Nullable<Text>,
        filename -> Text,
    }
}

diesel::table! {
    moddependency (modid, version, depmodid) {
        modid -> Text,
        version -> Text,
        depmodid -> Text,
        depversion -> Text,
    }
}

diesel::table! {
    modentryhash (modid, version, entryname) {
        modid -> Text,
        version -> Text,
        entryname -> Text,
        hash -> Text,
    }
}

diesel::joinable!(modversion -> mods (modid));

diesel::allow_tables_to_appear_in_same_query!(mods, modversion, moddependency, modentryhash);
