use serde::Serialize;

/// Manufacturing process a quote can be requested for. Codes are grouped by thousand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ManufacturingMethod {
    pub code: &'static str,
    pub name: &'static str,
    pub category: &'static str,
}

const fn method(
    code: &'static str,
    name: &'static str,
    category: &'static str,
) -> ManufacturingMethod {
    ManufacturingMethod {
        code,
        name,
        category,
    }
}

const METHODS: &[ManufacturingMethod] = &[
    method("1001", "Laser cutting", "Sheet metal forming"),
    method("1002", "Press brake bending", "Sheet metal forming"),
    method("1003", "Punching", "Sheet metal forming"),
    method("1004", "Plasma cutting", "Sheet metal forming"),
    method("1005", "Waterjet cutting", "Sheet metal forming"),
    method("1006", "Guillotine shearing", "Sheet metal forming"),
    method("1007", "Roll bending", "Sheet metal forming"),
    method("1009", "Metal spinning", "Sheet metal forming"),
    method("2001", "MIG/MAG welding", "Welding"),
    method("2002", "TIG welding", "Welding"),
    method("2004", "Spot welding", "Welding"),
    method("2005", "Robotic welding", "Welding"),
    method("3001", "CNC turning", "Machining"),
    method("3002", "CNC milling (3-axis)", "Machining"),
    method("3003", "CNC milling (4/5-axis)", "Machining"),
    method("3005", "Swiss-type turning", "Machining"),
    method("3006", "Wire EDM", "Machining"),
    method("3007", "Sinker EDM", "Machining"),
    method("3008", "Grinding", "Machining"),
    method("4001", "FDM printing", "Additive"),
    method("4002", "SLA printing", "Additive"),
    method("4003", "SLS printing", "Additive"),
    method("4004", "DMLS metal printing", "Additive"),
    method("5001", "Anodizing", "Surface treatment"),
    method("5002", "Galvanizing", "Surface treatment"),
    method("5003", "Powder coating", "Surface treatment"),
];

pub fn catalog() -> &'static [ManufacturingMethod] {
    METHODS
}

pub fn lookup(code: &str) -> Option<&'static ManufacturingMethod> {
    let code = code.trim();
    METHODS.iter().find(|method| method.code == code)
}
