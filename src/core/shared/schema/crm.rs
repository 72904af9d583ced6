diesel::table! {
    crm_users (id) {
        id -> Uuid,
        name -> Text,
        email -> Text,
        password_hash -> Text,
        role -> Text,
        can_view_all_reports -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    crm_leads (id) {
        id -> Uuid,
        name -> Text,
        company -> Nullable<Text>,
        email -> Nullable<Text>,
        phone -> Nullable<Text>,
        stage -> Text,
        value -> Nullable<Float8>,
        source -> Nullable<Text>,
        owner_id -> Nullable<Uuid>,
        lost_reason -> Nullable<Text>,
        attributes -> Jsonb,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    crm_clients (id) {
        id -> Uuid,
        lead_id -> Nullable<Uuid>,
        name -> Text,
        company -> Nullable<Text>,
        email -> Nullable<Text>,
        phone -> Nullable<Text>,
        owner_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    crm_notes (id) {
        id -> Uuid,
        lead_id -> Uuid,
        author_id -> Nullable<Uuid>,
        content -> Text,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(crm_leads -> crm_users (owner_id));
diesel::joinable!(crm_notes -> crm_leads (lead_id));

diesel::allow_tables_to_appear_in_same_query!(crm_users, crm_leads, crm_clients, crm_notes);
