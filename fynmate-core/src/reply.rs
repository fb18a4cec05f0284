//! Chat reply text. Plain strings; the transport adapter decides markup.

use crate::candidate::TransactionCandidate;
use crate::time::format_wall_clock;

pub const REJECTION: &str =
    "Oops! Nominal gak ketemu nih 😅\nCoba ketik kayak 'ngopi 20k' atau 'beli boba 25000'.";

/// Sent when an accepted expense could not be stored.
pub const SAVE_FAILED: &str = "⚠️ Gagal nyimpen transaksi, coba lagi nanti ya.";

/// "Rp 1,250,000"
pub fn format_rupiah(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 3);
    out.push_str("Rp ");
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn greeting(first_name: &str) -> String {
    format!("Hi {first_name}! 👋 Kirim aja pesan kayak 'makan siang 50k' buat nyatet pengeluaran 💸")
}

pub fn confirmation(candidate: &TransactionCandidate) -> String {
    format!(
        "✅ Noted bro, pengeluaran lo:\n\
         Deskripsi: {}\n\
         Nominal: {}\n\
         Metode Pembayaran: {}\n\
         Kategori: {}\n\
         Tanggal: {}",
        candidate.note,
        format_rupiah(candidate.amount),
        candidate.payment_method,
        candidate.category,
        format_wall_clock(candidate.occurred_at),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Category, PaymentMethod};
    use chrono::NaiveDate;

    #[test]
    fn test_format_rupiah() {
        assert_eq!(format_rupiah(0), "Rp 0");
        assert_eq!(format_rupiah(500), "Rp 500");
        assert_eq!(format_rupiah(25_000), "Rp 25,000");
        assert_eq!(format_rupiah(1_250_000), "Rp 1,250,000");
    }

    #[test]
    fn test_confirmation_lists_every_field() {
        let c = TransactionCandidate {
            amount: 20_000,
            category: Category::Food,
            note: "kopi".to_string(),
            payment_method: PaymentMethod::Ovo,
            occurred_at: NaiveDate::from_ymd_opt(2026, 1, 5)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        };
        let msg = confirmation(&c);
        assert!(msg.contains("Deskripsi: kopi"));
        assert!(msg.contains("Nominal: Rp 20,000"));
        assert!(msg.contains("Metode Pembayaran: OVO"));
        assert!(msg.contains("Kategori: Food"));
        assert!(msg.contains("Tanggal: 2026-01-05 08:00:00"));
    }
}
