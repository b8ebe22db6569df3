// src/shared/mod.rs

// Declara o submódulo com o envelope padrão das respostas da API
pub mod shared_structs;
// Declara o submódulo com os erros da API e a conversão para resposta HTTP
pub mod erros;
