mod restriction;
