//! dBase text encodings, chosen from the code page mark in the table header.

/// Evaluate `$body` with `$enc` bound to the dBase encoding for the code page `$mark`.
///
/// Decoding and encoding are lossy so a stray byte never fails a whole table. Tables
/// without a mark, or with one the code page tables do not cover, are read and written
/// as Windows-1252 (Latin-1 compatible).
macro_rules! with_dbf_encoding {
    ($mark:expr, |$enc:ident| $body:expr) => {{
        use shapefile::dbase::encoding::LossyCodePage;
        use shapefile::dbase::yore::code_pages;
        use shapefile::dbase::{CodePageMark, UnicodeLossy};
        match $mark {
            CodePageMark::Utf8 => {
                let $enc = UnicodeLossy;
                $body
            }
            CodePageMark::CP437 => {
                let $enc = LossyCodePage(code_pages::CP437);
                $body
            }
            CodePageMark::CP850 => {
                let $enc = LossyCodePage(code_pages::CP850);
                $body
            }
            CodePageMark::CP852 => {
                let $enc = LossyCodePage(code_pages::CP852);
                $body
            }
            CodePageMark::CP865 => {
                let $enc = LossyCodePage(code_pages::CP865);
                $body
            }
            CodePageMark::CP866 => {
                let $enc = LossyCodePage(code_pages::CP866);
                $body
            }
            CodePageMark::CP1250 => {
                let $enc = LossyCodePage(code_pages::CP1250);
                $body
            }
            CodePageMark::CP1251 => {
                let $enc = LossyCodePage(code_pages::CP1251);
                $body
            }
            _ => {
                let $enc = LossyCodePage(code_pages::CP1252);
                $body
            }
        }
    }};
}

pub(crate) use with_dbf_encoding;

