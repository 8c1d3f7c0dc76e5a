//! Prompts sent to the generative model.
//!
//! Both prompts live here so tests can inspect them without a live model.
//! The extraction instruction can be overridden via
//! [`crate::config::AppConfig::extraction_prompt`]; the NL-to-SQL template is
//! fixed because its examples must match the schema created by
//! [`crate::store::Store::ensure_schema`].

/// Instruction describing the target JSON and how to consolidate pages.
pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"You are a professional invoice extractor designed to handle multi-page invoices.
Read ALL the uploaded images carefully and consolidate the information from ALL pages into
**ONE** comprehensive invoice structure in **strict JSON format**.

Important instructions:
1. Combine information from all pages into a single invoice
2. Aggregate all line items from all pages
3. Use the total amount from the final page or summary page
4. Return **ONLY** the extracted structured information in **strict JSON format**, no extra text or explanation

Your response must look like this (with sample values):

{
  "invoice_id": "INV-001",
  "customer": "John Doe",
  "invoice_date": "2024-06-15",
  "total": 250.75,
  "items": [
    {
      "description": "Product A",
      "quantity": 2,
      "price": 100.00
    },
    {
      "description": "Service Fee",
      "quantity": 1,
      "price": 50.75
    }
  ]
}

Notes:
- Return only valid, strict JSON
- Use double quotes for all keys and string values
- No trailing commas
- No extra formatting or Markdown
- All values must be filled or null (avoid empty strings)
- Consolidate ALL items from ALL pages"#;

/// Few-shot NL-to-SQL template. `{question}` is replaced by the user's text.
pub const NL_TO_SQL_TEMPLATE: &str = r#"You are an expert in converting English questions to SQLite queries!
The database has the table invoice_master with columns invoice_id, customer, invoice_date, total, created_by, created_at.
The database has the table invoice_items with columns id, invoice_id, description, quantity, price.

Example 1: How many records are there in the table?
SQL: SELECT COUNT(*) FROM invoice_master;

Example 2: List all customers.
SQL: SELECT customer FROM invoice_master;

Example 3: Show me all invoices for customer John
SQL: SELECT * FROM invoice_master WHERE customer LIKE '%John%';

Example 4: What items are in invoice INV-001?
SQL: SELECT * FROM invoice_items WHERE invoice_id = 'INV-001';

Example 5: Show total sales by customer
SQL: SELECT customer, SUM(total) AS total_sales FROM invoice_master GROUP BY customer;

Only return the SQL query. Do not include markdown or explanations.

User Query: {question}"#;

/// Fill the NL-to-SQL template with the user's question.
pub fn nl_to_sql_prompt(question: &str) -> String {
    NL_TO_SQL_TEMPLATE.replace("{question}", question.trim())
}
