//! Remediation hints and explanations keyed by rule code.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::catalog::codes::*;

/// Short fix hint and long explanation for one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hint {
    pub fix: &'static str,
    pub explanation: &'static str,
}

const fn hint(fix: &'static str, explanation: &'static str) -> Hint {
    Hint { fix, explanation }
}

static HINTS: &[(u16, Hint)] = &[
    (TRUNCATED_FILE, hint(
        "Recover the missing bytes from the original source; the file ends early.",
        "The file ends before the header or data unit it declares is complete. \
         Transfers that were cut short and disks that filled during a write both \
         produce this. Nothing after the cut can be located.",
    )),
    (EXTRA_BYTES, hint(
        "Truncate the file at the end of the last HDU's final 2880-byte block.",
        "A FITS file ends exactly at the block boundary after its last HDU. Bytes \
         beyond that point do not form a valid extension and usually come from \
         concatenation or an interrupted write.",
    )),
    (UNDETERMINED_DATA_SIZE, hint(
        "Correct BITPIX, NAXIS and NAXISn so the data size can be computed.",
        "The size of the data unit is derived from BITPIX, NAXIS, NAXISn, PCOUNT \
         and GCOUNT. When any of them is missing or illegal the data cannot be \
         skipped, so no later HDU can be found.",
    )),
    (SOURCE_ACCESS, hint(
        "Check that the path exists and is readable.",
        "The source could not be opened or read. No verification was performed.",
    )),
    (NOT_FITS, hint(
        "Make sure the input is a FITS file; it must begin with a SIMPLE card.",
        "Every FITS file starts with the keyword SIMPLE in columns 1-8 of its \
         first header card. Input that does not is not a FITS file at all.",
    )),
    (MISSING_KEYWORD, hint(
        "Add the missing mandatory keyword to the header.",
        "The standard requires SIMPLE, BITPIX, NAXIS and NAXISn in the primary \
         header, and XTENSION, BITPIX, NAXIS, NAXISn, PCOUNT and GCOUNT in every \
         extension. Tables also need TFIELDS and a TFORMn per column.",
    )),
    (KEYWORD_ORDER, hint(
        "Move the mandatory keywords into the order the standard prescribes.",
        "Mandatory keywords occupy fixed positions at the start of a header: for \
         example SIMPLE first, then BITPIX, NAXIS and each NAXISn in turn.",
    )),
    (KEYWORD_DUPLICATE, hint(
        "Delete the repeated copy; this keyword may appear only once.",
        "A structural keyword that appears twice leaves readers to guess which \
         value describes the data.",
    )),
    (KEYWORD_VALUE, hint(
        "Replace the value with one the standard allows for this keyword.",
        "Mandatory keywords have restricted value sets. BITPIX, for instance, must \
         be one of 8, 16, 32, 64, -32 or -64.",
    )),
    (KEYWORD_TYPE, hint(
        "Write the value with the datatype the keyword requires.",
        "Mandatory keywords have fixed datatypes: BITPIX and NAXIS are integers, \
         SIMPLE is logical and XTENSION is a string.",
    )),
    (MISSING_END, hint(
        "Terminate the header with an END card and blank-fill the block.",
        "A header ends with the END keyword, followed by blank cards up to the \
         next 2880-byte boundary. Without it the header has no defined length.",
    )),
    (NOT_FIXED_FORMAT, hint(
        "Right-justify the value so it ends in column 30.",
        "Mandatory keywords use fixed format: '= ' in columns 9-10 and the value \
         right-justified in columns 11-30, or a string starting in column 11.",
    )),
    (NONASCII_HEADER, hint(
        "Replace the character with printable ASCII (codes 32-126).",
        "Header records may contain only printable ASCII. Tabs, control codes and \
         UTF-8 sequences are not permitted anywhere in a card.",
    )),
    (ILLEGAL_NAME_CHAR, hint(
        "Rename the keyword using only A-Z, 0-9, hyphen and underscore.",
        "Keyword names are built from upper-case letters, digits, '-' and '_'. \
         Lower-case letters and embedded blanks make the keyword unreadable to \
         standard software.",
    )),
    (NAME_NOT_JUSTIFIED, hint(
        "Start the keyword name in column 1.",
        "Keyword names are left-justified in columns 1-8 with no leading blanks.",
    )),
    (NO_COMMENT_SEPARATOR, hint(
        "Insert a '/' between the value and the comment text.",
        "Text after a value is a comment only when introduced by a slash. \
         Anything else makes the value field ambiguous.",
    )),
    (MISSING_QUOTE, hint(
        "Close the string value with a single quote.",
        "String values are enclosed in single quotes within columns 11-80. Longer \
         strings use the CONTINUE convention instead of running off the card.",
    )),
    (BAD_LOGICAL, hint(
        "Write the logical value as T or F.",
        "Logical values are the single characters T or F, conventionally in \
         column 30. Words such as TRUE are not logical values.",
    )),
    (BAD_NUMBER, hint(
        "Rewrite the number in FITS integer or floating-point form.",
        "Numbers follow Fortran conventions: an optional sign, digits, an optional \
         decimal point and an optional exponent introduced by E or D.",
    )),
    (LOWERCASE_EXPONENT, hint(
        "Use an upper-case E or D for the exponent.",
        "The standard requires exponent letters in floating-point values to be \
         upper case.",
    )),
    (BAD_COMPLEX, hint(
        "Write the complex value as (real, imaginary).",
        "Complex values are two numbers separated by a comma and enclosed in \
         parentheses, for example (1.0, -2.5).",
    )),
    (UNKNOWN_VALUE_TYPE, hint(
        "Write the value as a string, logical, number or complex pair.",
        "The value field does not match any FITS value type. Strings need quotes; \
         logicals are T or F; numbers start with a digit, sign or point.",
    )),
    (BAD_STRING, hint(
        "Remove control characters from the string value.",
        "Quoted strings may contain only printable ASCII characters.",
    )),
    (WRONG_TYPE, hint(
        "Change the value to the datatype this reserved keyword expects.",
        "Reserved keywords such as EXTNAME, EXTVER, BSCALE or DATE-OBS have a \
         defined datatype. A value of another type will be misread or ignored.",
    )),
    (LEADING_SPACE, hint(
        "Remove the leading blanks inside the quoted value.",
        "Values of keywords such as XTENSION and TFORMn are compared literally; \
         leading blanks are significant and make them unrecognisable.",
    )),
    (END_NOT_BLANK, hint(
        "Blank out columns 9-80 of the END card.",
        "The END card consists of the letters END followed by 77 blanks. Any \
         other content is illegal.",
    )),
    (UNRECOGNIZED_KEYWORD, hint(
        "Enable the HIERARCH convention check, or use a standard 8-character keyword.",
        "The card uses the HIERARCH long-keyword convention. It is widely used but \
         is not part of the standard, so its content is not checked unless the \
         convention is enabled.",
    )),
    (XTENSION_IN_PRIMARY, hint(
        "Remove XTENSION from the primary header.",
        "XTENSION introduces an extension header. The primary header starts with \
         SIMPLE and must not contain XTENSION.",
    )),
    (IMAGE_KEY_IN_TABLE, hint(
        "Remove BSCALE, BZERO, BUNIT, BLANK, DATAMIN and DATAMAX from the table.",
        "These keywords describe image pixels. Tables use the column-specific \
         forms TSCALn, TZEROn, TUNITn and TNULLn.",
    )),
    (TABLE_KEY_IN_IMAGE, hint(
        "Remove TFIELDS and column keywords from the image header.",
        "Column keywords such as TFIELDS, TTYPEn, TFORMn and TBCOLn are only \
         meaningful in table extensions.",
    )),
    (PRIMARY_KEY_IN_EXTENSION, hint(
        "Remove SIMPLE, EXTEND, GROUPS and BLOCKED from the extension.",
        "These keywords belong to the primary header only.",
    )),
    (BLANK_IN_FLOAT_IMAGE, hint(
        "Remove BLANK; floating-point images mark undefined pixels with NaN.",
        "BLANK names the integer value that marks undefined pixels. Floating-point \
         images use IEEE NaN for that purpose, so BLANK is not allowed there.",
    )),
    (BAD_TFIELDS, hint(
        "Set TFIELDS to the number of columns, between 0 and 999.",
        "TFIELDS declares how many columns the table has. Each column 1..TFIELDS \
         then needs its own TFORMn.",
    )),
    (NAXIS1_MISMATCH, hint(
        "Make NAXIS1 equal the sum of the column widths.",
        "In a binary table NAXIS1 is the row length in bytes and must equal the \
         total width implied by all TFORMn values.",
    )),
    (BAD_TFORM, hint(
        "Correct TFORMn to a valid column format.",
        "ASCII tables use formats such as A10, I6 or E15.7; binary tables use a \
         repeat count and type code such as 1J, 20A or 1PE(100).",
    )),
    (INDEX_EXCEEDS_TFIELDS, hint(
        "Remove the column keyword or increase TFIELDS.",
        "A column keyword refers to a column number larger than TFIELDS, so it \
         describes a column that does not exist.",
    )),
    (TBCOL_OUT_OF_RANGE, hint(
        "Adjust TBCOLn so every column fits inside NAXIS1 characters.",
        "In an ASCII table each column starts at TBCOLn and spans the TFORMn \
         width. The field must lie within the row length NAXIS1.",
    )),
    (WRONG_TABLE_KEYWORD, hint(
        "Remove the keyword; it belongs to the other kind of table.",
        "TBCOLn is used only by ASCII tables and TDIMn only by binary tables.",
    )),
    (DATA_FILL, hint(
        "Pad the data unit with zeros, or with blanks for ASCII tables.",
        "Bytes between the end of the data and the next 2880-byte boundary must \
         be zero, except in ASCII tables where they must be ASCII blanks.",
    )),
    (HEADER_FILL, hint(
        "Fill the header after END with blanks.",
        "Every byte after the END card up to the block boundary must be an ASCII \
         blank (code 32).",
    )),
    (NONFINITE_FLOAT, hint(
        "Replace infinite values, or mark undefined pixels with NaN.",
        "Infinite floating-point values cannot represent a physical measurement. \
         Undefined pixels in floating-point arrays are conventionally NaN.",
    )),
    (BLANK_OUT_OF_RANGE, hint(
        "Choose a BLANK value representable in the image's integer type.",
        "BLANK must be a value that can actually be stored in the pixels, for \
         example between -32768 and 32767 when BITPIX = 16.",
    )),
    (DECLARED_RANGE_EXCEEDS_TYPE, hint(
        "Correct DATAMIN and DATAMAX to values the pixel type can hold.",
        "DATAMIN and DATAMAX describe the stored values. For integer images they \
         cannot lie outside the range of the declared BITPIX.",
    )),
    (DATA_OUTSIDE_DECLARED_RANGE, hint(
        "Recompute DATAMIN and DATAMAX from the data.",
        "Some pixel values lie outside the declared DATAMIN..DATAMAX range, so \
         the keywords no longer describe the data.",
    )),
    (BAD_LOGICAL_DATA, hint(
        "Store logical column values as 'T', 'F' or 0.",
        "Logical columns in binary tables may hold only the bytes 'T', 'F' or \
         NUL for undefined.",
    )),
    (NONASCII_DATA, hint(
        "Replace non-ASCII bytes in the character column.",
        "Character columns in binary tables hold printable ASCII, with NUL \
         allowed as padding.",
    )),
    (NONASCII_TABLE, hint(
        "Replace bytes above 127 in the ASCII table.",
        "ASCII table data consists of 7-bit ASCII characters only.",
    )),
    (DATASUM_MISMATCH, hint(
        "Recompute DATASUM if the data is correct; otherwise restore the file.",
        "The checksum of the data unit no longer matches DATASUM, so the data has \
         changed since the checksum was written.",
    )),
    (HEADER_MODIFIED, hint(
        "Recompute CHECKSUM after editing the header.",
        "The data checksum matches but the whole-HDU checksum does not, which \
         means the header was edited after CHECKSUM was computed.",
    )),
    (CHECKSUM_MISMATCH, hint(
        "Recompute CHECKSUM if the HDU is correct; otherwise restore the file.",
        "The ones-complement sum of the HDU is not negative zero, so the header \
         or data changed after CHECKSUM was written.",
    )),
    (CHECKSUM_MISSING, hint(
        "Add CHECKSUM and DATASUM with a checksum utility.",
        "Checksums are optional, but without them corruption cannot be detected \
         after the file leaves its producer.",
    )),
    (CHECKSUM_MALFORMED, hint(
        "Recompute the checksum keywords; the stored value is not valid.",
        "CHECKSUM holds 16 encoded characters and DATASUM a decimal integer. A \
         value of another form cannot be verified.",
    )),
    (VAR_EXCEEDS_MAXLEN, hint(
        "Raise the (max) in the column's TFORM to the longest array stored.",
        "A P or Q column declares the largest array it holds in TFORMn. A row \
         with a longer array means the keyword is stale or the descriptor is \
         corrupt.",
    )),
    (VAR_EXCEEDS_HEAP, hint(
        "Rewrite the table so every array lies inside the heap, and set PCOUNT \
         to the heap size.",
        "An array descriptor points past the PCOUNT bytes of heap that follow \
         the table, so readers cannot load the array.",
    )),
    (BIT_NOT_JUSTIFIED, hint(
        "Store bit arrays left justified and clear the unused trailing bits.",
        "An X column of n bits fills the high-order bits of its bytes first. \
         The bits past n in the last byte must be zero.",
    )),
    (NO_DECIMAL, hint(
        "Write floating-point table fields with an explicit decimal point.",
        "Without a decimal point, readers place an implicit one from the d of \
         TFORMn = 'Fw.d', which changes the value of most numbers.",
    )),
    (EMBEDDED_SPACE, hint(
        "Remove spaces inside numbers in the ASCII table.",
        "Numeric fields in ASCII tables may be padded with spaces but must not \
         contain one between their digits.",
    )),
    (TOO_MANY_ERRORS, hint(
        "Fix the first errors reported; later ones are probably consequences.",
        "Verification stopped after the error count passed its limit. Errors in \
         such numbers usually cascade from one structural problem.",
    )),
    (SIMPLE_FALSE, hint(
        "Set SIMPLE = T if the file conforms to the standard.",
        "SIMPLE = F declares that the file does not conform to the standard. \
         Many readers will refuse it.",
    )),
    (DEPRECATED_KEYWORD, hint(
        "Replace EPOCH with EQUINOX and remove BLOCKED.",
        "These keywords are deprecated. EQUINOX supersedes EPOCH, and BLOCKED \
         described tape blocking that no longer applies.",
    )),
    (DUPLICATE_EXTNAME, hint(
        "Give each HDU a unique EXTNAME and EXTVER combination.",
        "HDUs are commonly addressed by EXTNAME and EXTVER. When two share both, \
         tools cannot tell them apart.",
    )),
    (ZERO_SCALE, hint(
        "Set BSCALE to a non-zero value.",
        "Physical values are computed as BZERO + BSCALE * stored value. A zero \
         scale maps every pixel to the same value.",
    )),
    (LEGACY_XTENSION, hint(
        "Convert the extension to IMAGE, TABLE or BINTABLE.",
        "Only IMAGE, TABLE and BINTABLE are standard extension types. Older types \
         such as A3DTABLE, IUEIMAGE, FOREIGN and DUMP are poorly supported.",
    )),
    (RANDOM_GROUPS, hint(
        "Store grouped data in a binary table instead.",
        "The random-groups structure is deprecated; binary tables offer the same \
         capability with far better support.",
    )),
    (DUPLICATE_KEYWORD, hint(
        "Remove or rename the repeated keyword.",
        "Apart from COMMENT, HISTORY, blank and CONTINUE, each keyword should \
         appear at most once in a header.",
    )),
    (Y2K_DATE, hint(
        "Write dates as YYYY-MM-DD.",
        "The old DD/MM/YY form is ambiguous around the year 2000 and was replaced \
         by the ISO 8601 form YYYY-MM-DD[Thh:mm:ss].",
    )),
    (DATE_FORMAT, hint(
        "Write dates as YYYY-MM-DD or YYYY-MM-DDThh:mm:ss[.s].",
        "Date keywords use the ISO 8601 calendar form. Other layouts cannot be \
         parsed reliably by archive software.",
    )),
    (MISSING_LONGSTRN, hint(
        "Add LONGSTRN = 'OGIP 1.0' to the header.",
        "The header uses CONTINUE long strings but does not declare the \
         convention with the LONGSTRN keyword.",
    )),
    (TIMESYS_VALUE, hint(
        "Set TIMESYS to a recognised time scale such as UTC, TAI, TT or TDB.",
        "TIMESYS names the time scale of all time keywords. Unrecognised values \
         leave times uninterpretable.",
    )),
    (INHERIT_WITH_PRIMARY_DATA, hint(
        "Remove INHERIT, or keep the primary HDU free of data.",
        "INHERIT = T lets an extension inherit primary keywords. It is only \
         meaningful when the primary HDU has no data array.",
    )),
    (MISSING_EXTNAME, hint(
        "Add an EXTNAME keyword naming the extension.",
        "Archives identify extensions by EXTNAME. Unnamed extensions can only be \
         addressed by position.",
    )),
    (BAD_COLUMN_NAME, hint(
        "Rename the column using letters, digits and underscores.",
        "Column names with other characters break many tools that select columns \
         by name.",
    )),
    (MISSING_COLUMN_NAME, hint(
        "Add a TTYPEn keyword naming the column.",
        "Columns without TTYPEn can only be addressed by number.",
    )),
    (DUPLICATE_COLUMN_NAME, hint(
        "Give each column a unique TTYPEn value.",
        "Column names are compared without regard to case. Duplicates make \
         selection by name ambiguous.",
    )),
    (HIERARCH_DUPLICATE, hint(
        "Remove or rename the repeated HIERARCH keyword.",
        "Each HIERARCH keyword name should occur once per header.",
    )),
    (HIERARCH_MALFORMED, hint(
        "Write the HIERARCH card as 'HIERARCH name = value'.",
        "A HIERARCH card without '=' has no recognisable keyword name or value.",
    )),
];

/// Read-only lookup table of hints, shared by every context.
#[derive(Debug)]
pub struct HintBase {
    hints: BTreeMap<u16, Hint>,
}

impl HintBase {
    /// The built-in table, indexed on first use.
    pub fn builtin() -> &'static HintBase {
        static BUILTIN: OnceLock<HintBase> = OnceLock::new();
        BUILTIN.get_or_init(|| HintBase {
            hints: HINTS.iter().copied().collect(),
        })
    }

    /// Hint and explanation for `code`; `(None, None)` when there is no entry.
    pub fn lookup(&self, code: u16) -> (Option<&'static str>, Option<&'static str>) {
        match self.hints.get(&code) {
            Some(h) => (Some(h.fix), Some(h.explanation)),
            None => (None, None),
        }
    }

    pub fn len(&self) -> usize {
        self.hints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hints.is_empty()
    }
}
