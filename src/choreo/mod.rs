pub mod choreographer;
