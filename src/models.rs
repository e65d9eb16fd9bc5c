// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Brightfield Primary School

//! # Portal API Data Models
//!
//! Request and response structures for the self-service portals. All types
//! derive `Serialize`, `Deserialize`, and `ToSchema` for automatic JSON
//! handling and OpenAPI documentation. They mirror the backend's wire
//! shapes; the gateway relays them without reinterpretation.
//!
//! ## Model Categories
//!
//! - **News**: published announcements on the public site
//! - **Staff**: the public staff directory
//! - **Admission**: admission application submissions
//! - **Payments**: tuition payment status lookups
//! - **Reports**: report-card availability lookups

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// News Models
// =============================================================================

/// A published news post.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct NewsPost {
    /// Unique identifier for this post.
    pub id: String,
    /// Post headline.
    pub title: String,
    /// URL slug.
    pub slug: String,
    /// Short teaser shown on listing pages.
    pub excerpt: String,
    /// Publication timestamp.
    pub published_at: DateTime<Utc>,
}

/// One page of news posts.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewsPage {
    pub posts: Vec<NewsPost>,
    /// 1-based page number.
    pub page: u32,
    pub total_pages: u32,
}

// =============================================================================
// Staff Directory Models
// =============================================================================

/// A staff directory entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StaffMember {
    pub id: String,
    /// Full display name.
    pub name: String,
    /// Position, e.g. "Year 3 Teacher" or "Head of School".
    pub role: String,
    /// Optional portrait URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

// =============================================================================
// Admission Models
// =============================================================================

/// An admission application submitted through the public form.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdmissionApplication {
    /// Full name of the child.
    pub child_name: String,
    /// Child's year of birth.
    pub birth_year: i32,
    /// Full name of the applying guardian.
    pub guardian_name: String,
    /// Guardian contact phone number.
    pub phone: String,
    /// Optional guardian e-mail address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Free-form notes from the guardian.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Oldest plausible applicant age for a primary school intake.
const MAX_APPLICANT_AGE: i32 = 14;
/// Youngest plausible applicant age.
const MIN_APPLICANT_AGE: i32 = 3;

impl AdmissionApplication {
    /// Validate the submission before it is relayed to the backend.
    ///
    /// Returns a human-readable description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.child_name.trim().is_empty() {
            return Err("Child name is required".to_string());
        }
        if self.guardian_name.trim().is_empty() {
            return Err("Guardian name is required".to_string());
        }
        if self.phone.trim().is_empty() {
            return Err("A contact phone number is required".to_string());
        }

        let current_year = Utc::now().year();
        let earliest = current_year - MAX_APPLICANT_AGE;
        let latest = current_year - MIN_APPLICANT_AGE;
        if self.birth_year < earliest || self.birth_year > latest {
            return Err(format!(
                "Birth year must be between {earliest} and {latest}"
            ));
        }

        Ok(())
    }
}

/// Receipt returned by the backend for an accepted application.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdmissionReceipt {
    /// Application reference the guardian can quote later.
    pub id: String,
    /// Processing status, e.g. "received" or "under_review".
    pub status: String,
    pub submitted_at: DateTime<Utc>,
}

// =============================================================================
// Payment Models
// =============================================================================

/// Status of a single tuition invoice.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvoiceStatus {
    pub invoice_id: String,
    /// Billing period, e.g. "2026-09".
    pub period: String,
    /// Amount due, in minor currency units.
    pub amount_due: i64,
    /// "paid", "due", or "overdue".
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
}

/// Payment status for one student.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentStatus {
    pub student_id: String,
    pub invoices: Vec<InvoiceStatus>,
}

// =============================================================================
// Report Card Models
// =============================================================================

/// Report-card availability for a student and term.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportCard {
    pub student_id: String,
    /// Term identifier, e.g. "2026-T1".
    pub term: String,
    /// Whether the report card has been published.
    pub published: bool,
    /// Download link, present once published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}
